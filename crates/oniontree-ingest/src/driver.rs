//! Batch import over a stream of descriptors.

use crate::reconcile::CreatedCounts;
use crate::{
    reset_managed, DirectorySource, EntryError, ImportConfig, ImportError, ReconcileError,
    Reconciler, SourceItem, StreamError,
};
use oniontree_storage::Store;
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorClass {
    Read,
    Parse,
    Store,
}

/// A descriptor that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub path: PathBuf,
    pub class: ItemErrorClass,
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub succeeded: usize,
    pub failed: Vec<ItemError>,
    pub created: CreatedCounts,
    pub truncated: bool,
    pub cancelled: bool,
}

impl ImportReport {
    fn record_failure(&mut self, path: PathBuf, class: ItemErrorClass, err: impl Display) {
        let message = err.to_string();
        tracing::warn!(path = %path.display(), ?class, error = %message, "skipping descriptor");
        self.failed.push(ItemError {
            path,
            class,
            message,
        });
    }

    /// Number of descriptors looked at, successful or not.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// Drives the reconciler over every descriptor of a source.
pub struct BatchDriver<'s, S> {
    store: &'s mut S,
    config: ImportConfig,
    reconciler: Reconciler,
}

impl<'s, S: Store> BatchDriver<'s, S> {
    pub fn new(store: &'s mut S, config: ImportConfig, reconciler: Reconciler) -> Self {
        Self {
            store,
            config,
            reconciler,
        }
    }

    /// Opens the configured directory, truncates if asked to, and runs.
    ///
    /// The root is checked before anything is truncated, so a mistyped
    /// path never wipes the store.
    pub fn run_import(&mut self) -> Result<ImportReport, ImportError> {
        let source = DirectorySource::open(&self.config)?;
        let truncated = if self.config.truncate {
            reset_managed(&mut *self.store).map_err(ImportError::Reset)?;
            true
        } else {
            false
        };

        let mut report = self.run(source)?;
        report.truncated = truncated;
        Ok(report)
    }

    /// Reconciles every item of `source`.
    ///
    /// Read, parse and data-class store failures are recorded and the
    /// batch moves on. A source failure or a connectivity-class store
    /// failure ends the run. Cancellation stops after rolling back the
    /// in-flight descriptor and returns what was done so far.
    pub fn run<I>(&mut self, source: I) -> Result<ImportReport, ImportError>
    where
        I: IntoIterator<Item = Result<SourceItem, StreamError>>,
    {
        let mut report = ImportReport::default();

        for item in source {
            if self.reconciler.cancel_token().is_cancelled() {
                report.cancelled = true;
                break;
            }

            let SourceItem { path, entry } = item?;
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let class = match err {
                        EntryError::Read(_) => ItemErrorClass::Read,
                        EntryError::Parse(_) => ItemErrorClass::Parse,
                    };
                    report.record_failure(path, class, err);
                    continue;
                }
            };

            tracing::debug!(
                path = %path.display(),
                tag = %entry.tag,
                slug = %entry.slug,
                "reconciling descriptor"
            );
            match self.reconciler.reconcile(&mut *self.store, &entry) {
                Ok(done) => {
                    report.succeeded += 1;
                    report.created += done.created;
                }
                Err(ReconcileError::Cancelled) => {
                    tracing::info!(path = %path.display(), "import cancelled; descriptor rolled back");
                    report.cancelled = true;
                    break;
                }
                Err(ReconcileError::Store(source)) if source.is_fatal() => {
                    return Err(ImportError::Store { path, source });
                }
                Err(err) => report.record_failure(path, ItemErrorClass::Store, err),
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            services_created = report.created.services,
            public_keys_created = report.created.public_keys,
            urls_created = report.created.urls,
            tags_created = report.created.tags,
            associations_added = report.created.associations,
            cancelled = report.cancelled,
            "import finished"
        );
        Ok(report)
    }
}
