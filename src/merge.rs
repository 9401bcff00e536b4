//! Merge engine: fold bundle certificates into a keystore and persist it.

use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::bundle::{self, Bundle};
use crate::cert::Fingerprint;
use crate::config::LoaderConfig;
use crate::error::LoaderResult;
use crate::keystore::Keystore;
use crate::store::{self, PersistOutcome};

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub skipped_duplicates: usize,
    pub skipped_malformed: usize,
    /// Entries in the merged keystore.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No bundle file and no certificate directory exists; nothing to do.
    BundleAbsent,
    /// Every bundle certificate was already present; the file was not rewritten.
    Unchanged(MergeSummary),
    Persisted(MergeSummary),
    /// The keystore could not be written. The file on disk is as it was.
    PersistDenied(MergeSummary),
}

/// Run one merge as configured. Only fatal conditions are returned as errors.
pub fn merge(config: &LoaderConfig) -> LoaderResult<MergeOutcome> {
    let keystore_path = config.keystore_path()?;

    let Some(bundle) = collect_sources(config)? else {
        debug!(bundle = %config.bundle.display(), "no certificate sources, nothing to load");
        return Ok(MergeOutcome::BundleAbsent);
    };

    let mut keystore = Keystore::load(keystore_path, &config.password)?;
    let summary = merge_into(
        &mut keystore,
        &bundle,
        &config.alias_prefix,
        Utc::now().trunc_subsecs(3),
    )?;

    if summary.added == 0 {
        info!(
            keystore = %keystore_path.display(),
            duplicates = summary.skipped_duplicates,
            "keystore already contains every certificate"
        );
        return Ok(MergeOutcome::Unchanged(summary));
    }

    let bytes = keystore.encode(&config.password)?;
    match store::write_atomic(keystore_path, &bytes)? {
        PersistOutcome::Written => {
            info!(
                keystore = %keystore_path.display(),
                added = summary.added,
                total = summary.total,
                "added certificates to keystore"
            );
            Ok(MergeOutcome::Persisted(summary))
        }
        PersistOutcome::Denied { refused_by } => {
            warn!(
                keystore = %keystore_path.display(),
                refused_by = %refused_by.display(),
                pending = summary.added,
                "keystore is not writable, leaving it unchanged"
            );
            Ok(MergeOutcome::PersistDenied(summary))
        }
    }
}

/// Gather the bundle file and certificate directories. `None` if none exist.
fn collect_sources(config: &LoaderConfig) -> LoaderResult<Option<Bundle>> {
    let mut found = bundle::load_bundle(&config.bundle)?;
    for dir in &config.cert_dirs {
        if let Some(b) = bundle::load_directory(dir)? {
            found.get_or_insert_with(Bundle::default).append(b);
        }
    }
    Ok(found)
}

/// Append every certificate of `bundle` not already in `keystore`, under fresh
/// `<prefix>-NNN` aliases. Existing entries are left untouched.
pub fn merge_into(
    keystore: &mut Keystore,
    bundle: &Bundle,
    alias_prefix: &str,
    created: DateTime<Utc>,
) -> LoaderResult<MergeSummary> {
    let mut known: HashSet<Fingerprint> = keystore
        .trusted_certificates()
        .map(|tc| *tc.certificate.fingerprint())
        .collect();
    let mut summary = MergeSummary {
        skipped_malformed: bundle.skipped.len(),
        ..MergeSummary::default()
    };
    let mut next_index = 0;

    for record in &bundle.certificates {
        if !known.insert(*record.fingerprint()) {
            debug!(fingerprint = %record.fingerprint_hex(), "certificate already present");
            summary.skipped_duplicates += 1;
            continue;
        }
        let alias = next_alias(keystore, alias_prefix, &mut next_index);
        debug!(%alias, fingerprint = %record.fingerprint_hex(), "adding certificate");
        keystore.add_trusted_certificate(&alias, record.clone(), created)?;
        summary.added += 1;
    }

    summary.total = keystore.len();
    Ok(summary)
}

fn next_alias(keystore: &Keystore, prefix: &str, next_index: &mut usize) -> String {
    loop {
        let alias = format!("{prefix}-{:03}", *next_index);
        *next_index += 1;
        if !keystore.contains_alias(&alias) {
            return alias;
        }
    }
}
