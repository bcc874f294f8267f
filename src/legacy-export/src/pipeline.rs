//! Export pipeline
//!
//! A single driver walks the archive in indexing order. Each eligible package
//! is serialized and its files are written in parallel on the export pool;
//! every file of one package is settled before the next entry starts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::classify::{Classifier, SkipReason, Verdict};
use crate::entry::{ArchiveEntry, SerializedAssets};
use crate::manifest::ManifestRecorder;
use crate::provider::ArchiveProvider;
use crate::remap::{Remap, Remapper};
use crate::{Error, Result};

/// Worker count matching the available hardware parallelism
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Progress bar with one step per archive entry
pub fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Result of writing one package's files
#[derive(Debug, Default)]
pub struct AssetsOutcome {
    pub written: usize,
    pub excluded: usize,
    pub failed: usize,
    pub collisions: usize,
    /// Set when the destination itself became unusable
    pub fatal: Option<Error>,
}

enum PairOutcome {
    Written { collision: bool },
    Excluded,
    Failed,
    Fatal(Error),
}

/// Totals for one run
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub examined: usize,
    pub eligible: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub entries_failed: usize,
    pub files_written: usize,
    pub pairs_excluded: usize,
    pub pairs_failed: usize,
    pub collisions: usize,
    /// Environment error that stopped extraction early
    pub aborted: Option<Error>,
}

impl ExportSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn absorb(&mut self, outcome: &AssetsOutcome) {
        self.files_written += outcome.written;
        self.pairs_excluded += outcome.excluded;
        self.pairs_failed += outcome.failed;
        self.collisions += outcome.collisions;
    }

    /// Emit the end-of-run totals
    pub fn log(&self) {
        info!(
            "Examined {} entries: {} eligible, {} skipped, {} failed",
            self.examined,
            self.eligible,
            self.skipped_total(),
            self.entries_failed
        );
        for (reason, count) in &self.skipped {
            info!("  skipped ({}): {}", reason, count);
        }
        info!(
            "Wrote {} file(s), excluded {}, failed {}, overwritten by later packages {}",
            self.files_written, self.pairs_excluded, self.pairs_failed, self.collisions
        );
        if let Some(err) = &self.aborted {
            error!("Extraction aborted: {}", err);
        }
    }
}

/// Drives classification, serialization and writing
pub struct Exporter {
    classifier: Classifier,
    remapper: Remapper,
    manifest: Arc<ManifestRecorder>,
    pool: rayon::ThreadPool,
}

impl Exporter {
    pub fn new(
        classifier: Classifier,
        remapper: Remapper,
        manifest: Arc<ManifestRecorder>,
        jobs: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .thread_name(|i| format!("export-{}", i))
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;

        Ok(Self {
            classifier,
            remapper,
            manifest,
            pool,
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn manifest(&self) -> &Arc<ManifestRecorder> {
        &self.manifest
    }

    /// Export every eligible entry. Never fails as a whole: per-entry errors
    /// are logged and counted, and an environment error stops the loop with
    /// `aborted` set.
    pub fn run<P>(&self, provider: &mut P, progress: &ProgressBar) -> ExportSummary
    where
        P: ArchiveProvider + Send,
    {
        self.pool.install(|| self.run_entries(provider, progress))
    }

    fn run_entries<P: ArchiveProvider>(
        &self,
        provider: &mut P,
        progress: &ProgressBar,
    ) -> ExportSummary {
        let entries = provider.entries();
        progress.set_length(entries.len() as u64);

        let mut summary = ExportSummary::default();

        for entry in &entries {
            summary.examined += 1;

            let verdict = self
                .classifier
                .classify(entry, || provider.load_package(entry));

            match verdict {
                Verdict::Skip(reason) => {
                    debug!("Skipping {} ({})", entry.path, reason);
                    *summary.skipped.entry(reason).or_default() += 1;
                }
                Verdict::Eligible => {
                    summary.eligible += 1;
                    match self.export_entry(provider, entry) {
                        Ok(mut outcome) => {
                            summary.absorb(&outcome);
                            summary.aborted = outcome.fatal.take();
                        }
                        Err(e) => {
                            summary.entries_failed += 1;
                            error!("File '{}' reported error: {}", entry.path, e);
                        }
                    }
                }
            }

            progress.inc(1);

            if summary.aborted.is_some() {
                break;
            }
        }

        summary
    }

    fn export_entry<P: ArchiveProvider>(
        &self,
        provider: &mut P,
        entry: &ArchiveEntry,
    ) -> Result<AssetsOutcome> {
        let assets = provider
            .serialize_package(&entry.path)
            .ok_or_else(|| Error::Package {
                path: entry.path.clone(),
                message: "serialization failed".to_string(),
            })?;

        debug!("Exporting {} ({} file(s))", entry.path, assets.len());
        Ok(self.write_assets(&assets))
    }

    /// Remap and write every file of one package in parallel.
    pub fn write_assets(&self, assets: &SerializedAssets) -> AssetsOutcome {
        let results: Vec<PairOutcome> = self.pool.install(|| {
            assets
                .par_iter()
                .map(|(path, bytes)| self.write_pair(path, bytes))
                .collect()
        });

        let mut outcome = AssetsOutcome::default();
        for result in results {
            match result {
                PairOutcome::Written { collision } => {
                    outcome.written += 1;
                    if collision {
                        outcome.collisions += 1;
                    }
                }
                PairOutcome::Excluded => outcome.excluded += 1,
                PairOutcome::Failed => outcome.failed += 1,
                PairOutcome::Fatal(e) => {
                    outcome.failed += 1;
                    if outcome.fatal.is_none() {
                        outcome.fatal = Some(e);
                    }
                }
            }
        }
        outcome
    }

    fn write_pair(&self, archive_path: &str, bytes: &[u8]) -> PairOutcome {
        let destination = match self.remapper.remap(archive_path) {
            Ok(Remap::Destination(path)) => path,
            Ok(Remap::Excluded) => {
                debug!("Excluding plugin content {}", archive_path);
                return PairOutcome::Excluded;
            }
            Err(e) => {
                warn!("Cannot place {}: {}", archive_path, e);
                return PairOutcome::Failed;
            }
        };

        match Remapper::write(&destination, bytes) {
            Ok(()) => {
                let first = self.manifest.record(destination.clone());
                if !first {
                    warn!(
                        "{} written again by {} (last write wins)",
                        destination.display(),
                        archive_path
                    );
                }
                PairOutcome::Written { collision: !first }
            }
            Err(e) if e.is_environment() => PairOutcome::Fatal(e),
            Err(e) => {
                error!("Failed to write {}: {}", archive_path, e);
                // Tell a bad file apart from a destination that is gone
                match self.remapper.check_root() {
                    Ok(()) => PairOutcome::Failed,
                    Err(fatal) => PairOutcome::Fatal(fatal),
                }
            }
        }
    }

    /// Classify every entry without writing anything
    pub fn list<P: ArchiveProvider>(&self, provider: &mut P) -> Vec<(ArchiveEntry, Verdict)> {
        provider
            .entries()
            .into_iter()
            .map(|entry| {
                let verdict = self
                    .classifier
                    .classify(&entry, || provider.load_package(&entry));
                (entry, verdict)
            })
            .collect()
    }
}
