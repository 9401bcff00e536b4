//! Binary JKS layout: decode with digest verification, deterministic encode.

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use std::collections::HashSet;

use super::{mutf8, Keystore, KeystoreEntry, OpaqueEntry, TrustedCertificate, X509_CERT_TYPE};
use crate::cert::CertificateRecord;
use crate::error::{LoaderError, LoaderResult};

pub const MAGIC: u32 = 0xFEED_FEED;
pub const DIGEST_LEN: usize = 20;

const WHITENER: &[u8] = b"Mighty Aphrodite";
const TAG_PRIVATE_KEY: u32 = 1;
const TAG_TRUSTED_CERT: u32 = 2;
const HEADER_LEN: usize = 12;

/// SHA-1 over the password (UTF-16BE), the fixed whitener and `body`.
pub fn compute_digest(password: &str, body: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha1::new();
    for unit in password.encode_utf16() {
        hasher.update(unit.to_be_bytes());
    }
    hasher.update(WHITENER);
    hasher.update(body);
    hasher.finalize().into()
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> LoaderResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(LoaderError::format(format!(
                "truncated while reading {what} at offset {}",
                self.pos
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u16(&mut self, what: &str) -> LoaderResult<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &str) -> LoaderResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self, what: &str) -> LoaderResult<u64> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_be_bytes(out))
    }

    fn utf(&mut self, what: &str) -> LoaderResult<String> {
        let len = self.u16(what)? as usize;
        let bytes = self.take(len, what)?;
        mutf8::decode(bytes)
            .ok_or_else(|| LoaderError::format(format!("malformed {what} string")))
    }

    fn sized(&mut self, what: &str) -> LoaderResult<&'a [u8]> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }

    fn timestamp(&mut self) -> LoaderResult<DateTime<Utc>> {
        let millis = self.u64("creation time")? as i64;
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| LoaderError::format(format!("creation time {millis} out of range")))
    }
}

pub(super) fn decode(bytes: &[u8], password: &str) -> LoaderResult<Keystore> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(LoaderError::format(format!(
            "file is {} bytes, too short for a keystore",
            bytes.len()
        )));
    }
    let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);
    let mut r = Reader::new(body);

    let magic = r.u32("magic")?;
    if magic != MAGIC {
        return Err(LoaderError::format(format!("bad magic {magic:#010x}")));
    }
    let version = r.u32("version")?;
    if !(1..=2).contains(&version) {
        return Err(LoaderError::format(format!("unsupported version {version}")));
    }

    let count = r.u32("entry count")? as usize;
    let mut entries = Vec::with_capacity(count.min(1024));
    let mut seen = HashSet::new();
    for index in 0..count {
        let tag = r.u32("entry tag")?;
        let entry = match tag {
            TAG_TRUSTED_CERT => {
                KeystoreEntry::TrustedCertificate(read_trusted(&mut r, version)?)
            }
            TAG_PRIVATE_KEY => KeystoreEntry::Opaque(read_private_key(&mut r, version)?),
            _ => return Err(LoaderError::UnsupportedEntry { tag, index }),
        };
        if !seen.insert(entry.alias().to_lowercase()) {
            return Err(LoaderError::format(format!(
                "duplicate alias '{}'",
                entry.alias()
            )));
        }
        entries.push(entry);
    }

    if r.remaining() != 0 {
        return Err(LoaderError::format(format!(
            "{} unexpected bytes after the last entry",
            r.remaining()
        )));
    }
    if compute_digest(password, body).as_slice() != digest {
        return Err(LoaderError::Integrity);
    }

    Ok(Keystore::from_parts(version, entries))
}

fn read_trusted(r: &mut Reader<'_>, version: u32) -> LoaderResult<TrustedCertificate> {
    let alias = r.utf("alias")?;
    let created = r.timestamp()?;
    let cert_type = if version >= 2 {
        r.utf("certificate type")?
    } else {
        X509_CERT_TYPE.to_string()
    };
    let der = r.sized("certificate")?.to_vec();
    Ok(TrustedCertificate {
        alias,
        created,
        cert_type,
        certificate: CertificateRecord::from_der_unchecked(der),
    })
}

/// Walks a private-key entry only far enough to find where it ends.
fn read_private_key(r: &mut Reader<'_>, version: u32) -> LoaderResult<OpaqueEntry> {
    let start = r.pos;
    let alias = r.utf("alias")?;
    r.u64("creation time")?;
    r.sized("protected key")?;
    let chain = r.u32("certificate chain length")?;
    for _ in 0..chain {
        if version >= 2 {
            r.utf("certificate type")?;
        }
        r.sized("chain certificate")?;
    }
    Ok(OpaqueEntry {
        tag: TAG_PRIVATE_KEY,
        alias,
        raw: r.buf[start..r.pos].to_vec(),
    })
}

pub(super) fn encode(keystore: &Keystore, password: &str) -> LoaderResult<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&keystore.version().to_be_bytes());
    put_len_u32(&mut out, keystore.len(), "entry count")?;

    for entry in keystore.entries() {
        match entry {
            KeystoreEntry::TrustedCertificate(tc) => {
                out.extend_from_slice(&TAG_TRUSTED_CERT.to_be_bytes());
                put_utf(&mut out, &tc.alias)?;
                out.extend_from_slice(&(tc.created.timestamp_millis() as u64).to_be_bytes());
                if keystore.version() >= 2 {
                    put_utf(&mut out, &tc.cert_type)?;
                }
                let der = tc.certificate.der();
                put_len_u32(&mut out, der.len(), "certificate")?;
                out.extend_from_slice(der);
            }
            KeystoreEntry::Opaque(opaque) => {
                out.extend_from_slice(&opaque.tag.to_be_bytes());
                out.extend_from_slice(&opaque.raw);
            }
        }
    }

    let digest = compute_digest(password, &out);
    out.extend_from_slice(&digest);
    Ok(out)
}

fn put_utf(out: &mut Vec<u8>, s: &str) -> LoaderResult<()> {
    let bytes = mutf8::encode(s);
    let len = u16::try_from(bytes.len())
        .map_err(|_| LoaderError::format(format!("string of {} bytes is too long", bytes.len())))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&bytes);
    Ok(())
}

fn put_len_u32(out: &mut Vec<u8>, len: usize, what: &str) -> LoaderResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| LoaderError::format(format!("{what} length {len} does not fit the format")))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}
