//! Removal, dependents expansion and confirmation.

mod helpers;

use addon_manager::addons::{AddonError, StateStore};
use helpers::TestEnv;
use pretty_assertions::assert_eq;

const HASH: &str = "cccccccc33333333333333333333333333333333";

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// Installs `acme/x`, `acme/y` (depends on x), `acme/z` (depends on y) and
/// `other/w`.
fn installed_env() -> TestEnv {
    let env = TestEnv::new();
    env.git.publish("acme/x", HASH, &[]);
    env.git.publish("acme/y", HASH, &[(".dependencies", "acme/x\n")]);
    env.git.publish("acme/z", HASH, &[(".dependencies", "acme/y\n")]);
    env.git.publish("other/w", HASH, &[]);
    env.manager()
        .install_addons("acme/z,other/w", false)
        .unwrap();
    env.out.clear();
    env
}

#[test]
fn test_remove_single_addon_keeps_non_empty_parent() {
    let env = installed_env();

    env.manager().remove_addon("acme/z").unwrap();

    assert!(!env.root().join("acme/z").exists());
    assert!(env.root().join("acme").is_dir());
    let state = StateStore::new(env.state_path()).load().unwrap();
    assert!(!state.contains_key("acme/z"));
    assert_eq!(state.len(), 3);

    let text = env.out.text();
    assert!(text.contains("Removing addon 'acme/z' in"));
    assert!(text.contains("\tRemoved installed directory './acme/z'"));
    assert!(!text.contains("Removed empty parent directory"));
}

#[test]
fn test_remove_last_addon_of_owner_removes_parent() {
    let env = installed_env();

    env.manager().remove_addon("other/w").unwrap();

    assert!(!env.root().join("other").exists());
    assert!(env.root().is_dir());
    assert!(
        env.out
            .text()
            .contains("\tRemoved empty parent directory './other'")
    );
}

#[test]
fn test_remove_missing_addon_is_not_installed() {
    let env = installed_env();

    let err = env.manager().remove_addon("acme/nothing").unwrap_err();

    match err {
        AddonError::NotInstalled { name, path } => {
            assert_eq!(name, "acme/nothing");
            assert_eq!(path, env.root().join("acme/nothing"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(StateStore::new(env.state_path()).load().unwrap().len(), 4);
}

#[test]
fn test_remove_with_dependents_is_single_level() {
    let env = installed_env();

    let removed = env.manager().remove_addons("acme/x", true).unwrap();

    assert_eq!(removed, names(&["acme/x", "acme/y"]));
    let state = StateStore::new(env.state_path()).load().unwrap();
    assert_eq!(
        state.keys().cloned().collect::<Vec<_>>(),
        names(&["acme/z", "other/w"])
    );

    let text = env.out.text();
    assert!(text.contains("Removing the following requested add-ons:\n\tacme/x\n"));
    assert!(text.contains("and the following dependent add-ons:\n\tacme/y\n"));
    assert!(text.contains("Are you sure you wish to continue [y/N]? "));
}

#[test]
fn test_remove_without_dependents() {
    let env = installed_env();

    let removed = env.manager().remove_addons("acme/x", false).unwrap();

    assert_eq!(removed, names(&["acme/x"]));
    assert!(env.root().join("acme/y").exists());
    assert!(!env.out.text().contains("dependent add-ons"));
}

#[test]
fn test_declined_removal_changes_nothing() {
    let env = installed_env();
    let before = std::fs::read_to_string(env.state_path()).unwrap();

    for answer in ["n", "", "YES", "no"] {
        let removed = env
            .manager_answering(answer)
            .remove_addons("acme/x", true)
            .unwrap();
        assert!(removed.is_empty());
    }

    assert!(env.root().join("acme/x").exists());
    assert!(env.root().join("acme/y").exists());
    assert_eq!(std::fs::read_to_string(env.state_path()).unwrap(), before);
}

#[test]
fn test_empty_list_removes_everything() {
    let env = installed_env();

    let removed = env.manager_answering("yes").remove_addons("", true).unwrap();

    assert_eq!(
        removed,
        names(&["acme/x", "acme/y", "acme/z", "other/w"])
    );
    assert!(StateStore::new(env.state_path()).load().unwrap().is_empty());
    assert!(!env.root().join("acme").exists());
    assert!(!env.root().join("other").exists());
}

#[test]
fn test_remove_with_nothing_installed() {
    let env = TestEnv::new();

    let removed = env.manager().remove_addons("", true).unwrap();

    assert!(removed.is_empty());
    assert!(env.out.text().contains("No add-ons to remove."));
}

#[test]
fn test_remove_by_url() {
    let env = installed_env();

    let removed = env
        .manager()
        .remove_addons("https://github.com/other/w.git", false)
        .unwrap();

    assert_eq!(removed, names(&["other/w"]));
    assert!(!env.root().join("other").exists());
}
