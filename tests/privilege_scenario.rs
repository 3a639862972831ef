// tests/privilege_scenario.rs — root/adm/operator walkthrough

use nonosh::auth::{Outcome, PrivilegeStore, UserOptions};
use pretty_assertions::assert_eq;

#[test]
fn operator_cannot_become_root() {
    let (store, mut session) = PrivilegeStore::bootstrap("operator");
    let out = store.su(&mut session, "root", None);
    assert!(matches!(out, Outcome::AuthDenied(_)));
    assert_eq!(store.whoami(&session), "operator");
}

#[test]
fn adm_becomes_root_then_root_becomes_operator() {
    let (store, mut session) = PrivilegeStore::bootstrap("adm");
    assert!(store.su(&mut session, "root", None).is_ok());
    assert_eq!(store.whoami(&session), "root");
    assert!(store.is_root(&session));

    assert!(store.su(&mut session, "operator", None).is_ok());
    assert_eq!(store.whoami(&session), "operator");
}

#[test]
fn passwd_rotation_invalidates_old_secret() {
    let (mut store, _) = PrivilegeStore::bootstrap("operator");

    let operator = store.session_for("operator").unwrap();
    assert!(matches!(store.passwd(&operator, "adm", "newpass"), Outcome::AuthDenied(_)));

    let adm = store.session_for("adm").unwrap();
    assert!(store.passwd(&adm, "adm", "newpass").is_ok());

    // third user trying both secrets
    let root = store.session_for("root").unwrap();
    store.useradd(&root, "guest", UserOptions::default());
    let mut guest = store.session_for("guest").unwrap();
    assert!(matches!(store.su(&mut guest, "adm", Some("unstable")), Outcome::AuthFailure(_)));
    assert_eq!(guest.username(), "guest");
    assert!(store.su(&mut guest, "adm", Some("newpass")).is_ok());
    assert_eq!(guest.username(), "adm");
}

#[test]
fn failed_attempt_does_not_touch_credentials() {
    let (store, mut session) = PrivilegeStore::bootstrap("adm");
    let before = store.serialize(&session);
    assert!(!store.su(&mut session, "operator", Some("nope")).is_ok());
    assert_eq!(store.serialize(&session), before);
}

#[test]
fn every_wheel_or_sudo_member_escalates_and_others_do_not() {
    let (mut store, root) = PrivilegeStore::bootstrap("root");
    let cases = [
        ("w1", vec!["wheel"], true),
        ("s1", vec!["sudo"], true),
        ("both", vec!["wheel", "sudo"], true),
        ("plain", vec![], false),
        ("video", vec!["video", "audio"], false),
    ];
    for (name, groups, _) in &cases {
        let opts = UserOptions { groups: groups.iter().map(|g| g.to_string()).collect(), ..Default::default() };
        assert!(store.useradd(&root, name, opts).is_ok());
    }
    for (name, _, allowed) in &cases {
        let mut s = store.session_for(name).unwrap();
        let out = store.su(&mut s, "root", None);
        assert_eq!(out.is_ok(), *allowed, "{}", name);
        assert_eq!(s.username(), if *allowed { "root" } else { *name });
    }
}

#[test]
fn useradd_uid_follows_max() {
    let (mut store, root) = PrivilegeStore::bootstrap("root");
    let opts = UserOptions { uid: Some(2000), ..Default::default() };
    assert!(store.useradd(&root, "high", opts).is_ok());
    assert!(store.useradd(&root, "next", UserOptions::default()).is_ok());
    assert_eq!(store.user("next").map(|u| u.uid), Some(2001));

    let op = store.session_for("operator").unwrap();
    assert!(matches!(store.useradd(&op, "sneaky", UserOptions::default()), Outcome::AuthDenied(_)));
    assert!(store.user("sneaky").is_none());
}
