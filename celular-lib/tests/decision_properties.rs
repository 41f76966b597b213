//! Library-level checks of the decision against the fixture hosts.

use celular_lib::config::Config;
use celular_lib::decision::{Decision, decide};
use celular_lib::providers::{Registry, SystemPaths};
use camino::Utf8PathBuf;
use serde_json::json;

fn registry(host_name: &str) -> Registry {
    let root = Utf8PathBuf::from(format!("{}/tests/fixtures/hosts/{host_name}", env!("CARGO_MANIFEST_DIR")));
    Registry::system(&SystemPaths::rooted(&root), false)
}

fn config(exprs: &[&str]) -> Config {
    let expressions: Vec<_> = exprs
        .iter()
        .map(|expr| json!({"uses": ["processes", "mounts", "users", "common_users"], "expr": expr}))
        .collect();

    Config::parse(&json!({"config": {"expressions": expressions}}).to_string()).unwrap()
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_in_use_is_the_or_of_all_predicates() {
    let registry = registry("workstation");
    let truths = ["size(common_users) == 1", "procs.exists(p, p.pid == 2048)", "users.exists(u, u.pw_shell == '/bin/bash')"];
    let lies = ["size(mounts) == 0", "procs.exists(p, p.name == 'nginx')", "'bob' in common_users"];

    for lie_count in 0..=lies.len() {
        for truth_count in 0..=truths.len() {
            if lie_count + truth_count == 0 {
                continue;
            }

            let exprs: Vec<&str> = lies[..lie_count].iter().chain(&truths[..truth_count]).copied().collect();
            let decision = decide(&config(&exprs), &registry);
            assert_eq!(decision.in_use(), truth_count > 0, "{exprs:?}");
            assert!(!matches!(decision, Decision::Failed(_)), "{exprs:?}");
        }
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_same_snapshot_same_answer() {
    let registry = registry("idle-server");
    let config = config(&["procs.exists(p, p.name == 'sshd' && p.username != 'root')", "size(mounts) > 1"]);

    let first = decide(&config, &registry);
    let second = decide(&config, &registry);
    assert!(matches!(first, Decision::NotInUse));
    assert!(matches!(second, Decision::NotInUse));
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_virtual_mounts_only_when_asked() {
    let root = Utf8PathBuf::from(format!("{}/tests/fixtures/hosts/idle-server", env!("CARGO_MANIFEST_DIR")));
    let config = config(&["mounts.exists(m, m.mountpoint == '/run')"]);

    let physical = Registry::system(&SystemPaths::rooted(&root), false);
    assert!(matches!(decide(&config, &physical), Decision::NotInUse));

    let everything = Registry::system(&SystemPaths::rooted(&root), true);
    assert!(matches!(decide(&config, &everything), Decision::InUse));
}

#[test]
fn test_binding_names_are_checked_when_parsing() {
    let text = json!({"config": {"globals": {"not-valid": true}, "expressions": [{"uses": ["mounts"], "expr": "true"}]}});
    let err = Config::parse(&text.to_string()).unwrap_err();
    assert!(err.to_string().contains("not-valid"));
}
