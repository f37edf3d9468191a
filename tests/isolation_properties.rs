//! Isolation properties of provisioned environments.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use dapcheck::harness::environment::AdapterRegistry;
use dapcheck::harness::{HarnessConfig, Provisioner};
use proptest::prelude::*;

#[test]
fn concurrent_environments_never_share_a_runtime_root() {
    let scratch = tempfile::tempdir().unwrap();
    let provisioner = Provisioner::new(&HarnessConfig::new().with_scratch_dir(scratch.path()));
    let roots = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provisioner = provisioner.clone();
            let roots = Arc::clone(&roots);
            thread::spawn(move || {
                for _ in 0..4 {
                    let env = provisioner.provision().unwrap();
                    roots.lock().unwrap().push(env.runtime_root().to_path_buf());
                    env.destroy().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let roots = roots.lock().unwrap();
    let unique: HashSet<_> = roots.iter().collect();
    assert_eq!(roots.len(), 32);
    assert_eq!(unique.len(), roots.len());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn registry_file_round_trips() {
    let scratch = tempfile::tempdir().unwrap();
    let config = HarnessConfig::new().with_scratch_dir(scratch.path()).with_python("/usr/bin/python3");
    let provisioner = Provisioner::new(&config);
    let env = provisioner.provision().unwrap();

    let text = std::fs::read_to_string(env.registry_path()).unwrap();
    let parsed = AdapterRegistry::from_toml(env.registry_path(), &text).unwrap();
    assert_eq!(&parsed, provisioner.registry());
    assert_eq!(parsed.adapters["debugpy"].path, "/usr/bin/python3");
    env.destroy().unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: every destroyed environment leaves nothing behind, however many were live at once.
    #[test]
    fn destroyed_environments_leave_nothing(count in 1usize..6) {
        let scratch = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::new(&HarnessConfig::new().with_scratch_dir(scratch.path()));

        let envs: Vec<_> = (0..count).map(|_| provisioner.provision().unwrap()).collect();
        let roots: HashSet<_> = envs.iter().map(|e| e.root().to_path_buf()).collect();
        prop_assert_eq!(roots.len(), count);

        for env in envs {
            let config_root = env.config_root().to_path_buf();
            let runtime_root = env.runtime_root().to_path_buf();
            env.destroy().unwrap();
            prop_assert!(!config_root.exists());
            prop_assert!(!runtime_root.exists());
        }
        prop_assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
