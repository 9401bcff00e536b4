//! cacerts-loader - merge PEM CA certificates into a JKS trust store.

pub mod bundle;
pub mod cert;
pub mod cli;
pub mod config;
pub mod error;
pub mod keystore;
pub mod merge;
pub mod store;

pub use config::LoaderConfig;
pub use error::{LoaderError, LoaderResult};
pub use merge::{merge, MergeOutcome, MergeSummary};
