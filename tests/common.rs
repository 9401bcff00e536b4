//! Shared test helpers.
#![allow(dead_code)]

use cacerts_loader::cert::CertificateRecord;
use cacerts_loader::keystore::{Keystore, DEFAULT_PASSWORD};
use chrono::{DateTime, Utc};
use rcgen::{CertificateParams, KeyPair};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a scratch directory under the workspace.
pub fn temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("cacerts_test_")
        .tempdir_in(std::env::current_dir().unwrap_or_else(|_| std::path::Path::new(".").into()))
        .expect("temp dir")
}

/// Self-signed throwaway certificate with the given common name.
pub fn generate_cert(cn: &str) -> rcgen::Certificate {
    let key = KeyPair::generate().expect("generate key");
    let mut params = CertificateParams::new(vec![format!("{cn}.test")]).expect("params");
    params.distinguished_name = rcgen::DistinguishedName::new();
    params.distinguished_name.push(
        rcgen::DnType::CommonName,
        rcgen::DnValue::Utf8String(cn.to_string()),
    );
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    params.self_signed(&key).expect("self-sign")
}

pub fn record(cert: &rcgen::Certificate) -> CertificateRecord {
    CertificateRecord::parse(cert.der().as_ref().to_vec()).expect("valid certificate")
}

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_600_000_000_123).expect("timestamp")
}

/// Keystore with one trusted entry per certificate, aliased `existing-N`.
pub fn keystore_with(certs: &[&rcgen::Certificate]) -> Keystore {
    let mut ks = Keystore::new();
    for (i, cert) in certs.iter().enumerate() {
        ks.add_trusted_certificate(&format!("existing-{i}"), record(cert), fixed_time())
            .expect("add entry");
    }
    ks
}

pub fn write_keystore(path: &Path, ks: &Keystore) {
    fs::write(path, ks.encode(DEFAULT_PASSWORD).expect("encode")).expect("write keystore");
}

pub fn read_keystore(path: &Path) -> Keystore {
    let bytes = fs::read(path).expect("read keystore");
    Keystore::decode(&bytes, DEFAULT_PASSWORD).expect("decode keystore")
}

/// Concatenate certificates into PEM bundle text.
pub fn bundle_pem(certs: &[&rcgen::Certificate]) -> String {
    certs.iter().map(|c| c.pem()).collect::<Vec<_>>().join("\n")
}

pub fn write_bundle(dir: &Path, name: &str, pem: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, pem).expect("write bundle");
    path
}

/// PEM block whose base64 is fine but whose content is not a certificate.
pub const MALFORMED_BLOCK: &str =
    "-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydGlmaWNhdGU=\n-----END CERTIFICATE-----\n";

/// Make `path` read-only. Returns false when the process can still write it
/// (e.g. running as root), in which case the caller should skip.
#[cfg(unix)]
pub fn make_read_only(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o555)).expect("chmod");
    fs::OpenOptions::new().write(true).open(path).is_err()
}

/// Length-prefixed ASCII string as written by `DataOutput.writeUTF`.
pub fn utf(s: &str) -> Vec<u8> {
    let mut out = (s.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(s.as_bytes());
    out
}

/// Serialized private-key entry body (everything after the tag).
pub fn private_key_entry(alias: &str, created_millis: u64, key: &[u8], chain: &[&[u8]]) -> Vec<u8> {
    let mut out = utf(alias);
    out.extend_from_slice(&created_millis.to_be_bytes());
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(key);
    out.extend_from_slice(&(chain.len() as u32).to_be_bytes());
    for cert in chain {
        out.extend_from_slice(&utf("X.509"));
        out.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        out.extend_from_slice(cert);
    }
    out
}

/// Hand-assembled version 2 keystore from `(tag, body)` pairs, with a valid digest.
pub fn raw_keystore(entries: &[(u32, Vec<u8>)], password: &str) -> Vec<u8> {
    let mut out = cacerts_loader::keystore::MAGIC.to_be_bytes().to_vec();
    out.extend_from_slice(&2u32.to_be_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (tag, body) in entries {
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(body);
    }
    let digest = cacerts_loader::keystore::compute_digest(password, &out);
    out.extend_from_slice(&digest);
    out
}
