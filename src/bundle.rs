//! PEM certificate bundles (OpenSSL `SSL_CERT_FILE` / `SSL_CERT_DIR` style).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span, warn};

use crate::cert::CertificateRecord;
use crate::error::{LoaderError, LoaderResult};

/// A PEM block that was dropped instead of failing the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    /// Zero-based position among the PEM blocks of its source.
    pub index: usize,
    pub reason: String,
}

/// Certificates in source order, plus whatever was skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub certificates: Vec<CertificateRecord>,
    pub skipped: Vec<SkippedBlock>,
}

impl Bundle {
    /// Number of certificates parsed successfully.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// True when no certificate survived parsing, skipped blocks aside.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Move `other`'s certificates and skipped blocks after this bundle's own.
    pub fn append(&mut self, mut other: Bundle) {
        self.certificates.append(&mut other.certificates);
        self.skipped.append(&mut other.skipped);
    }
}

/// Parse every `CERTIFICATE` block in `pem`. Other PEM kinds are ignored.
pub fn parse_bundle(pem: &[u8]) -> Bundle {
    let mut bundle = Bundle::default();
    let mut reader = pem;
    let mut index = 0;

    loop {
        let before = reader.len();
        match rustls_pemfile::read_one(&mut reader) {
            Ok(None) => break,
            Ok(Some(rustls_pemfile::Item::X509Certificate(der))) => {
                match CertificateRecord::parse(der.as_ref().to_vec()) {
                    Ok(record) => bundle.certificates.push(record),
                    Err(e) => skip(&mut bundle, index, format!("not an X.509 certificate: {e}")),
                }
                index += 1;
            }
            Ok(Some(_)) => {
                debug!(index, "ignoring non-certificate PEM block");
                index += 1;
            }
            Err(e) => {
                skip(&mut bundle, index, format!("malformed PEM block: {e}"));
                index += 1;
                if reader.len() == before {
                    break;
                }
            }
        }
    }
    bundle
}

fn skip(bundle: &mut Bundle, index: usize, reason: String) {
    warn!(index, "skipping certificate: {reason}");
    bundle.skipped.push(SkippedBlock { index, reason });
}

/// Read and parse a bundle file; `None` if it does not exist.
pub fn load_bundle(path: &Path) -> LoaderResult<Option<Bundle>> {
    let pem = match fs::read(path) {
        Ok(pem) => pem,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LoaderError::io(path, e)),
    };
    let span = info_span!("bundle", path = %path.display());
    let _guard = span.enter();
    let bundle = parse_bundle(&pem);
    debug!(
        certificates = bundle.len(),
        skipped = bundle.skipped.len(),
        "parsed bundle"
    );
    Ok(Some(bundle))
}

/// Parse every regular file in `dir`, ordered by file name; `None` if `dir` does not exist.
pub fn load_directory(dir: &Path) -> LoaderResult<Option<Bundle>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LoaderError::io(dir, e)),
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for e in read_dir {
        let path = e.map_err(|e| LoaderError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut bundle = Bundle::default();
    for file in files {
        if let Some(b) = load_bundle(&file)? {
            bundle.append(b);
        }
    }
    Ok(Some(bundle))
}
