//! No bundle means nothing to do: success, keystore untouched.

mod common;

use cacerts_loader::{merge, LoaderConfig, MergeOutcome};
use std::fs;

#[test]
fn absent_bundle_short_circuits() {
    let dir = common::temp_dir();
    let cert = common::generate_cert("Root");
    let keystore_path = dir.path().join("cacerts");
    common::write_keystore(&keystore_path, &common::keystore_with(&[&cert]));
    let before = fs::read(&keystore_path).unwrap();

    let config = LoaderConfig::new(&keystore_path, dir.path().join("non-existent-file"));
    assert_eq!(merge(&config).unwrap(), MergeOutcome::BundleAbsent);

    assert_eq!(fs::read(&keystore_path).unwrap(), before);
    assert_eq!(common::read_keystore(&keystore_path).len(), 1);
}

#[test]
fn absent_bundle_does_not_read_corrupt_keystore() {
    let dir = common::temp_dir();
    let keystore_path = dir.path().join("cacerts");
    fs::write(&keystore_path, b"garbage").unwrap();

    let config = LoaderConfig::new(&keystore_path, dir.path().join("non-existent-file"));
    assert_eq!(merge(&config).unwrap(), MergeOutcome::BundleAbsent);
}

#[test]
fn absent_bundle_and_absent_directories_short_circuit() {
    let dir = common::temp_dir();
    let keystore_path = dir.path().join("cacerts");
    let mut config = LoaderConfig::new(&keystore_path, dir.path().join("missing.pem"));
    config.cert_dirs = vec![dir.path().join("missing-dir")];

    assert_eq!(merge(&config).unwrap(), MergeOutcome::BundleAbsent);
    assert!(!keystore_path.exists());
}
