//! Certificate records: DER bytes plus their content fingerprint.

use sha2::{Digest, Sha256};
use std::fmt::Write;
use x509_parser::error::X509Error;
use x509_parser::nom;
use x509_parser::prelude::{FromDer, X509Certificate};

/// SHA-256 over the DER encoding.
pub type Fingerprint = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    der: Vec<u8>,
    fingerprint: Fingerprint,
}

impl CertificateRecord {
    /// Wrap raw certificate bytes as stored in a keystore, without validating them.
    pub fn from_der_unchecked(der: Vec<u8>) -> Self {
        let fingerprint = Sha256::digest(&der).into();
        Self { der, fingerprint }
    }

    /// Validate `der` as a single X.509 certificate and wrap it.
    pub fn parse(der: Vec<u8>) -> Result<Self, X509Error> {
        let trailing = match X509Certificate::from_der(&der) {
            Ok((rest, _)) => !rest.is_empty(),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
            Err(nom::Err::Incomplete(_)) => return Err(X509Error::InvalidCertificate),
        };
        if trailing {
            return Err(X509Error::InvalidCertificate);
        }
        Ok(Self::from_der_unchecked(der))
    }

    /// The certificate exactly as it is stored in the keystore.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Identity used for deduplication across runs.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Colon separated upper-case hex, keytool style.
    pub fn fingerprint_hex(&self) -> String {
        let mut out = String::with_capacity(self.fingerprint.len() * 3);
        for (i, b) in self.fingerprint.iter().enumerate() {
            if i > 0 {
                out.push(':');
            }
            let _ = write!(out, "{b:02X}");
        }
        out
    }

    /// Subject DN, if the payload parses as X.509.
    pub fn subject(&self) -> Option<String> {
        X509Certificate::from_der(&self.der)
            .ok()
            .map(|(_, cert)| cert.subject().to_string())
    }
}
