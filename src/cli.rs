//! CLI definitions and command routing.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    Settings, ALIAS_PREFIX_ENV, BUNDLE_ENV, CERT_DIR_ENV, CONFIG_ENV, KEYSTORE_ENV, PASSWORD_ENV,
};
use crate::keystore::{Keystore, KeystoreEntry};
use crate::merge::{self, MergeOutcome};

#[derive(Parser)]
#[command(name = "cacerts-loader")]
#[command(about = "Merge PEM CA certificates into a JKS trust store")]
pub struct Cli {
    /// TOML settings file; flags and environment variables take precedence
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Used when no subcommand is given
    #[command(flatten)]
    pub load: LoadArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add bundle certificates missing from the keystore
    Load(LoadArgs),
    /// Print the entries of a keystore
    List(ListArgs),
}

#[derive(Args, Default)]
pub struct LoadArgs {
    /// Keystore to update
    #[arg(long, env = KEYSTORE_ENV)]
    pub keystore: Option<PathBuf>,
    /// PEM bundle to merge in
    #[arg(long, env = BUNDLE_ENV)]
    pub bundle: Option<PathBuf>,
    /// Directory of PEM files to merge in (repeatable, ':' separated in the environment)
    #[arg(long = "cert-dir", env = CERT_DIR_ENV, value_delimiter = ':')]
    pub cert_dirs: Vec<PathBuf>,
    /// Keystore integrity password
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,
    /// Prefix for aliases of added certificates
    #[arg(long, env = ALIAS_PREFIX_ENV)]
    pub alias_prefix: Option<String>,
}

impl LoadArgs {
    fn settings(self) -> Settings {
        Settings {
            keystore: self.keystore,
            bundle: self.bundle,
            cert_dirs: (!self.cert_dirs.is_empty()).then_some(self.cert_dirs),
            password: self.password,
            alias_prefix: self.alias_prefix,
        }
    }
}

#[derive(Args, Default)]
pub struct ListArgs {
    /// Keystore to read
    #[arg(long, env = KEYSTORE_ENV)]
    pub keystore: Option<PathBuf>,
    /// Keystore integrity password
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,
}

impl ListArgs {
    fn settings(self) -> Settings {
        Settings {
            keystore: self.keystore,
            password: self.password,
            ..Settings::default()
        }
    }
}

/// Parse CLI args and run command. Without a subcommand the tool loads.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let file_settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Some(Commands::Load(args)) => run_load(args.settings().or(file_settings)),
        Some(Commands::List(args)) => run_list(args.settings().or(file_settings)),
        None => run_load(cli.load.settings().or(file_settings)),
    }
}

fn run_load(settings: Settings) -> Result<()> {
    let config = settings.into_config();
    match merge::merge(&config)? {
        MergeOutcome::BundleAbsent => {
            tracing::info!(bundle = %config.bundle.display(), "no CA certificates found, skipping");
        }
        MergeOutcome::Unchanged(s) | MergeOutcome::Persisted(s) => {
            if s.skipped_malformed > 0 {
                tracing::warn!(count = s.skipped_malformed, "some bundle blocks were skipped");
            }
        }
        MergeOutcome::PersistDenied(_) => {}
    }
    Ok(())
}

fn run_list(settings: Settings) -> Result<()> {
    let config = settings.into_config();
    let path = config.keystore_path()?;
    let bytes = std::fs::read(path).with_context(|| format!("read keystore: {}", path.display()))?;
    let keystore = Keystore::decode(&bytes, &config.password)
        .with_context(|| format!("decode keystore: {}", path.display()))?;

    for entry in keystore.entries() {
        match entry {
            KeystoreEntry::TrustedCertificate(tc) => {
                let subject = tc.certificate.subject().unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\ttrustedCertEntry\t{}\t{}",
                    tc.alias,
                    tc.created.to_rfc3339(),
                    subject
                );
            }
            KeystoreEntry::Opaque(o) => {
                println!("{}\tentry(tag={})", o.alias, o.tag);
            }
        }
    }
    Ok(())
}
