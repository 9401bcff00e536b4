//! JKS keystore container.
//!
//! Trusted-certificate entries are fully modelled. Every other entry kind
//! (private keys) is carried as an [`OpaqueEntry`] holding its serialized
//! bytes, so a decode/encode cycle never loses or rewrites it.

mod codec;
mod mutf8;

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::debug;

use crate::cert::{CertificateRecord, Fingerprint};
use crate::error::{LoaderError, LoaderResult};

pub use codec::{compute_digest, DIGEST_LEN, MAGIC};

/// Password protecting the integrity of stock JVM trust stores.
pub const DEFAULT_PASSWORD: &str = "changeit";
pub const X509_CERT_TYPE: &str = "X.509";
const CURRENT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedCertificate {
    pub alias: String,
    pub created: DateTime<Utc>,
    pub cert_type: String,
    pub certificate: CertificateRecord,
}

/// An entry this codec does not interpret. `raw` is everything after the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueEntry {
    pub tag: u32,
    pub alias: String,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystoreEntry {
    TrustedCertificate(TrustedCertificate),
    Opaque(OpaqueEntry),
}

impl KeystoreEntry {
    pub fn alias(&self) -> &str {
        match self {
            KeystoreEntry::TrustedCertificate(tc) => &tc.alias,
            KeystoreEntry::Opaque(o) => &o.alias,
        }
    }

    pub fn as_trusted_certificate(&self) -> Option<&TrustedCertificate> {
        match self {
            KeystoreEntry::TrustedCertificate(tc) => Some(tc),
            KeystoreEntry::Opaque(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystore {
    version: u32,
    entries: Vec<KeystoreEntry>,
}

impl Default for Keystore {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            entries: Vec::new(),
        }
    }
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(version: u32, entries: Vec<KeystoreEntry>) -> Self {
        Self { version, entries }
    }

    /// Decode a complete keystore file, verifying its digest against `password`.
    pub fn decode(bytes: &[u8], password: &str) -> LoaderResult<Self> {
        codec::decode(bytes, password)
    }

    /// Encode to the on-disk layout with a freshly computed digest.
    pub fn encode(&self, password: &str) -> LoaderResult<Vec<u8>> {
        codec::encode(self, password)
    }

    /// Read and decode `path`; a missing file yields an empty keystore.
    pub fn load(path: &Path, password: &str) -> LoaderResult<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(&bytes, password),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "keystore does not exist, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(LoaderError::io(path, e)),
        }
    }

    /// Format version read from the file, or 2 for a new keystore.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of entries of any kind.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[KeystoreEntry] {
        &self.entries
    }

    /// Aliases in file order, as stored.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(KeystoreEntry::alias)
    }

    /// Aliases compare case-insensitively, as the JVM lower-cases them.
    pub fn get(&self, alias: &str) -> Option<&KeystoreEntry> {
        let wanted = alias.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.alias().to_lowercase() == wanted)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Trusted-certificate entries only; opaque entries are skipped.
    pub fn trusted_certificates(&self) -> impl Iterator<Item = &TrustedCertificate> {
        self.entries.iter().filter_map(KeystoreEntry::as_trusted_certificate)
    }

    /// Whether a trusted-certificate entry already holds this exact certificate.
    pub fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        self.trusted_certificates()
            .any(|tc| tc.certificate.fingerprint() == fingerprint)
    }

    /// Append a trusted-certificate entry. The alias is stored lower-cased.
    pub fn add_trusted_certificate(
        &mut self,
        alias: &str,
        certificate: CertificateRecord,
        created: DateTime<Utc>,
    ) -> LoaderResult<()> {
        if self.contains_alias(alias) {
            return Err(LoaderError::DuplicateAlias(alias.to_string()));
        }
        self.entries
            .push(KeystoreEntry::TrustedCertificate(TrustedCertificate {
                alias: alias.to_lowercase(),
                created,
                cert_type: X509_CERT_TYPE.to_string(),
                certificate,
            }));
        Ok(())
    }
}
