//! Environment provisioner: one private configuration root and runtime-socket root per scenario.
//!
//! ## Layout
//!
//! ```text
//! <scratch>/dapcheck-<pid>-<seq>/
//!     config/debugger-cli/config.toml   adapter registry (XDG_CONFIG_HOME = config/)
//!     runtime/                          daemon socket root (XDG_RUNTIME_DIR), mode 0700 on unix
//!     build/                            compiled debuggees
//! ```
//!
//! Directory names combine the process id with a process-wide sequence number, so a path is never handed out twice
//! in one process lifetime, whether environments are provisioned sequentially or from several threads.
//!
//! ## Teardown
//!
//! [`IsolatedEnvironment::destroy`] removes the whole tree and tolerates it already being gone. Dropping an
//! environment without calling `destroy` performs the same removal, so early returns and panics cannot leak a
//! runtime directory (and with it a stale daemon socket) into the next scenario.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dapcheck_core::adapters::{self, ADAPTERS, LaunchProgram};
use dapcheck_core::registry::Stability;
use serde::{Deserialize, Serialize};

use super::config::{HarnessConfig, Timeouts};
use super::error::{HarnessError, HarnessResult};

/// Variable the debugger reads its configuration root from.
pub const CONFIG_ROOT_VAR: &str = "XDG_CONFIG_HOME";
/// Variable the debugger places its daemon socket under.
pub const RUNTIME_ROOT_VAR: &str = "XDG_RUNTIME_DIR";
/// Application directory the debugger looks for under the configuration root.
pub const APP_CONFIG_DIR: &str = "debugger-cli";
pub const REGISTRY_FILE: &str = "config.toml";

/// Attempts before giving up on finding an unused directory name.
const MAX_NAME_ATTEMPTS: u32 = 64;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// Adapter registry (written for the debugger)
// ============================================================================

/// Declarative adapter registry the debugger reads at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterRegistry {
    pub adapters: BTreeMap<String, AdapterEntry>,
    pub defaults: RegistryDefaults,
    pub timeouts: RegistryTimeouts,
}

/// How the debugger launches one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterEntry {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDefaults {
    pub adapter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryTimeouts {
    pub dap_initialize_secs: u64,
    pub dap_request_secs: u64,
    pub await_default_secs: u64,
}

impl From<Timeouts> for RegistryTimeouts {
    fn from(t: Timeouts) -> Self {
        Self {
            dap_initialize_secs: t.adapter_initialize_secs,
            dap_request_secs: t.request_secs,
            await_default_secs: t.await_default_secs,
        }
    }
}

impl AdapterRegistry {
    /// Build the registry for a run: every optional adapter gets an explicit launch entry, the default adapter is
    /// left to the debugger's own lookup.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let mut entries: BTreeMap<String, AdapterEntry> = ADAPTERS
            .iter()
            .filter(|row| row.stability == Stability::Optional)
            .map(|row| {
                let launch = adapters::launch(row.id);
                let path = match launch.program {
                    LaunchProgram::Named(name) => name.to_string(),
                    LaunchProgram::PythonInterpreter => config.python.clone(),
                };
                let args = launch.args.iter().map(|a| a.to_string()).collect();
                (row.canonical.to_string(), AdapterEntry { path, args })
            })
            .collect();
        for (name, (path, args)) in &config.extra_adapters {
            let entry = AdapterEntry {
                path: path.clone(),
                args: args.clone(),
            };
            entries.insert(name.clone(), entry);
        }

        Self {
            adapters: entries,
            defaults: RegistryDefaults {
                adapter: adapters::as_str(config.default_adapter).to_string(),
            },
            timeouts: config.timeouts.into(),
        }
    }

    pub fn to_toml(&self) -> HarnessResult<String> {
        toml::to_string(self).map_err(|e| HarnessError::config(REGISTRY_FILE, e.to_string()))
    }

    pub fn from_toml(path: &Path, text: &str) -> HarnessResult<Self> {
        toml::from_str(text).map_err(|e| HarnessError::config(path, e.to_string()))
    }
}

// ============================================================================
// Provisioner
// ============================================================================

/// Creates isolated environments under a scratch directory.
#[derive(Debug, Clone)]
pub struct Provisioner {
    scratch_dir: PathBuf,
    registry: AdapterRegistry,
}

impl Provisioner {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            scratch_dir: config.scratch_dir.clone(),
            registry: AdapterRegistry::from_config(config),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Allocate a fresh directory tree and write the adapter registry into it.
    ///
    /// ## Errors
    ///
    /// Returns an error if the scratch directory is not writable or no unused name was found. A partially created
    /// tree is removed before the error is returned.
    pub fn provision(&self) -> HarnessResult<IsolatedEnvironment> {
        fs::create_dir_all(&self.scratch_dir)?;
        let root = self.allocate_root()?;

        let env = IsolatedEnvironment {
            config_root: root.join("config"),
            runtime_root: root.join("runtime"),
            build_dir: root.join("build"),
            registry_path: root.join("config").join(APP_CONFIG_DIR).join(REGISTRY_FILE),
            root,
            released: false,
        };

        // `env` owns the root from here on; an early return drops it and removes the tree.
        fs::create_dir_all(env.config_root.join(APP_CONFIG_DIR))?;
        create_private_dir(&env.runtime_root)?;
        fs::create_dir_all(&env.build_dir)?;
        fs::write(&env.registry_path, self.registry.to_toml()?)?;

        tracing::debug!(root = %env.root.display(), "provisioned isolated environment");
        Ok(env)
    }

    fn allocate_root(&self) -> HarnessResult<PathBuf> {
        let pid = std::process::id();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
            let candidate = self.scratch_dir.join(format!("dapcheck-{pid}-{seq:04}"));
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                // Left behind by an earlier process that had the same pid; never reuse it.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(HarnessError::config(
            &self.scratch_dir,
            format!("no unused environment directory after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(path)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

// ============================================================================
// Isolated environment
// ============================================================================

/// Private configuration and runtime state owned by exactly one scenario run.
#[derive(Debug)]
pub struct IsolatedEnvironment {
    root: PathBuf,
    config_root: PathBuf,
    runtime_root: PathBuf,
    build_dir: PathBuf,
    registry_path: PathBuf,
    released: bool,
}

impl IsolatedEnvironment {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_root(&self) -> &Path {
        &self.config_root
    }

    /// Root under which the debugger daemon creates its socket.
    pub fn runtime_root(&self) -> &Path {
        &self.runtime_root
    }

    /// Where compiled debuggees for this scenario are written.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    /// Environment variables that point the debugger at this environment.
    pub fn env_overrides(&self) -> Vec<(String, OsString)> {
        vec![
            (CONFIG_ROOT_VAR.to_string(), self.config_root.clone().into_os_string()),
            (RUNTIME_ROOT_VAR.to_string(), self.runtime_root.clone().into_os_string()),
        ]
    }

    /// Remove the environment, including its runtime-socket directory.
    ///
    /// Succeeds if the tree is already gone.
    pub fn destroy(mut self) -> io::Result<()> {
        self.released = true;
        let result = remove_tree(&self.root);
        match &result {
            Ok(()) => tracing::debug!(root = %self.root.display(), "destroyed isolated environment"),
            Err(e) => tracing::warn!(root = %self.root.display(), error = %e, "failed to destroy isolated environment"),
        }
        result
    }
}

impl Drop for IsolatedEnvironment {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = remove_tree(&self.root) {
                tracing::warn!(root = %self.root.display(), error = %e, "best-effort environment cleanup failed");
            }
        }
    }
}

/// Remove a directory tree, treating an already-absent path as success.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
