//! Layering guardrails to keep the vocabulary crate free of IO.
//!
//! `dapcheck_core` holds pure registries and the session state machine; the harness crate owns every process,
//! filesystem and serialization concern. This test scans the core crate's `Cargo.toml` and fails if an IO crate
//! appears in `[dependencies]`.

const FORBIDDEN: &[&str] = &["tokio", "serde", "serde_json", "toml", "tracing"];

#[test]
fn core_does_not_depend_on_io_crates() {
    let manifest = include_str!("../crates/dapcheck_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Strip inline comments for robustness.
        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        let name = line_no_comment.split(['=', '.', ' ']).next().unwrap_or("");
        assert!(
            !FORBIDDEN.contains(&name),
            "`{name}` must not appear in dapcheck_core's [dependencies]; keep IO in the harness crate"
        );
    }
}
