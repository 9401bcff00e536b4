//! decode(encode(k)) == k for empty, single and multi-entry keystores.

mod common;

use cacerts_loader::keystore::{Keystore, DEFAULT_PASSWORD, MAGIC};

fn roundtrip(ks: &Keystore) -> Keystore {
    let bytes = ks.encode(DEFAULT_PASSWORD).unwrap();
    Keystore::decode(&bytes, DEFAULT_PASSWORD).unwrap()
}

#[test]
fn empty_keystore_roundtrip() {
    let ks = Keystore::new();
    let bytes = ks.encode(DEFAULT_PASSWORD).unwrap();
    // header (12) + digest (20)
    assert_eq!(bytes.len(), 32);
    assert_eq!(&bytes[..4], &MAGIC.to_be_bytes());
    assert_eq!(roundtrip(&ks), ks);
}

#[test]
fn single_entry_roundtrip() {
    let cert = common::generate_cert("Single Root");
    let ks = common::keystore_with(&[&cert]);
    let decoded = roundtrip(&ks);
    assert_eq!(decoded, ks);
    assert_eq!(decoded.len(), 1);
    let tc = decoded.trusted_certificates().next().unwrap();
    assert_eq!(tc.alias, "existing-0");
    assert_eq!(tc.cert_type, "X.509");
    assert_eq!(tc.created, common::fixed_time());
    assert_eq!(tc.certificate.der(), cert.der().as_ref());
}

#[test]
fn many_entries_roundtrip_in_order() {
    let certs: Vec<_> = (0..5)
        .map(|i| common::generate_cert(&format!("Root {i}")))
        .collect();
    let refs: Vec<_> = certs.iter().collect();
    let ks = common::keystore_with(&refs);
    let decoded = roundtrip(&ks);
    assert_eq!(decoded, ks);
    let aliases: Vec<_> = decoded.aliases().collect();
    assert_eq!(
        aliases,
        vec!["existing-0", "existing-1", "existing-2", "existing-3", "existing-4"]
    );
}

#[test]
fn non_ascii_alias_roundtrip() {
    let cert = common::generate_cert("Umlaut Root");
    let mut ks = Keystore::new();
    ks.add_trusted_certificate("zürich-\u{1F512}-ca", common::record(&cert), common::fixed_time())
        .unwrap();
    let decoded = roundtrip(&ks);
    assert_eq!(decoded, ks);
    assert!(decoded.contains_alias("ZÜRICH-\u{1F512}-CA"));
}

#[test]
fn encoding_is_deterministic() {
    let a = common::generate_cert("A");
    let b = common::generate_cert("B");
    let ks = common::keystore_with(&[&a, &b]);
    assert_eq!(
        ks.encode(DEFAULT_PASSWORD).unwrap(),
        ks.encode(DEFAULT_PASSWORD).unwrap()
    );
}

#[test]
fn reencoding_decoded_bytes_is_byte_identical() {
    let a = common::generate_cert("A");
    let ks = common::keystore_with(&[&a]);
    let bytes = ks.encode(DEFAULT_PASSWORD).unwrap();
    let decoded = Keystore::decode(&bytes, DEFAULT_PASSWORD).unwrap();
    assert_eq!(decoded.encode(DEFAULT_PASSWORD).unwrap(), bytes);
}

#[test]
fn custom_password_roundtrip() {
    let a = common::generate_cert("A");
    let ks = common::keystore_with(&[&a]);
    let bytes = ks.encode("s3cret").unwrap();
    assert_eq!(Keystore::decode(&bytes, "s3cret").unwrap(), ks);
}

#[test]
fn duplicate_alias_rejected() {
    let a = common::generate_cert("A");
    let b = common::generate_cert("B");
    let mut ks = Keystore::new();
    ks.add_trusted_certificate("root", common::record(&a), common::fixed_time())
        .unwrap();
    let err = ks
        .add_trusted_certificate("ROOT", common::record(&b), common::fixed_time())
        .unwrap_err();
    assert!(matches!(err, cacerts_loader::LoaderError::DuplicateAlias(_)));
    assert_eq!(ks.len(), 1);
}
