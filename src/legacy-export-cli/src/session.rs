//! Whole-run state machine
//!
//! INIT selects and validates the roots, INDEXING mounts the archive and
//! checks it is the expected game, EXTRACTING runs the export pipeline and
//! FINALIZING flushes the manifest. Any failure before extraction returns to
//! INIT; every visit to INIT spends one attempt.

use legacy_export::{
    manifest_path, progress_bar, AesKey, ArchiveProvider, Classifier, Error, ExportSummary,
    Exporter, KeyGuid, ManifestRecorder, Remapper, Result, Verdict,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, Profile};
use crate::pak::PakProvider;
use crate::prompt::Prompt;
use crate::roots::{validate_content, validate_source};
use crate::signature::verify_project;

/// Creates a provider for a validated Paks directory
pub trait Opener {
    type Provider: ArchiveProvider + Send;

    fn open(&self, paks: &Path, profile: &Profile) -> Result<Self::Provider>;
}

pub struct PakOpener;

impl Opener for PakOpener {
    type Provider = PakProvider;

    fn open(&self, paks: &Path, profile: &Profile) -> Result<PakProvider> {
        PakProvider::open(paks, &profile.package_extensions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roots {
    pub paks: PathBuf,
    pub content: PathBuf,
}

pub enum RunState<P> {
    Init,
    Indexing(Roots),
    Extracting(Roots, P),
    Finalizing(Roots, ExportSummary),
    Done,
}

impl<P> RunState<P> {
    fn name(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Indexing(_) => "indexing",
            RunState::Extracting(..) => "extracting",
            RunState::Finalizing(..) => "finalizing",
            RunState::Done => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_attempts: u32,
    pub jobs: usize,
    pub list: bool,
    pub json: bool,
    pub aes_key: String,
    pub key_guid: String,
    /// Where accepted roots are remembered; `None` disables it
    pub config_path: Option<PathBuf>,
}

/// What a finished run produced
#[derive(Debug, Default)]
pub struct RunReport {
    pub attempts: u32,
    pub summary: Option<ExportSummary>,
    pub manifest: Option<PathBuf>,
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    path: &'a str,
    verdict: Verdict,
}

pub struct Session<O: Opener, Q: Prompt> {
    opener: O,
    prompt: Q,
    config: Config,
    options: SessionOptions,
    paks: Option<PathBuf>,
    content: Option<PathBuf>,
}

impl<O: Opener, Q: Prompt> Session<O, Q> {
    /// `paks`/`content` are the first candidates; missing or rejected ones
    /// are asked for.
    pub fn new(
        opener: O,
        prompt: Q,
        config: Config,
        options: SessionOptions,
        paks: Option<PathBuf>,
        content: Option<PathBuf>,
    ) -> Self {
        Self {
            opener,
            prompt,
            config,
            options,
            paks,
            content,
        }
    }

    pub fn run(mut self) -> Result<RunReport> {
        let key: AesKey = self.options.aes_key.parse()?;
        let guid: KeyGuid = self.options.key_guid.parse()?;
        let manifest = Arc::new(ManifestRecorder::new());

        let mut report = RunReport::default();
        let mut state: RunState<O::Provider> = RunState::Init;

        loop {
            debug!("state: {}", state.name());
            state = match state {
                RunState::Init => {
                    if report.attempts >= self.options.max_attempts {
                        return Err(Error::AttemptsExhausted(report.attempts));
                    }
                    report.attempts += 1;

                    match self.select_roots() {
                        Ok(Some(roots)) => RunState::Indexing(roots),
                        Ok(None) => return Err(Error::AttemptsExhausted(report.attempts)),
                        Err(e) => {
                            error!("{}", e);
                            RunState::Init
                        }
                    }
                }

                RunState::Indexing(roots) => match self.index(&roots, guid, &key) {
                    Ok(provider) => {
                        self.remember(&roots);
                        RunState::Extracting(roots, provider)
                    }
                    Err(e) => {
                        error!("{}", e);
                        // The archive is at fault; keep the destination
                        self.paks = None;
                        self.content = Some(roots.content);
                        RunState::Init
                    }
                },

                RunState::Extracting(roots, mut provider) => {
                    let profile = &self.config.profile;
                    let exporter = Exporter::new(
                        Classifier::new(profile.classifier_rules()),
                        Remapper::new(&roots.content, &profile.root_namespace),
                        Arc::clone(&manifest),
                        self.options.jobs,
                    )?;

                    if self.options.list {
                        self.print_listing(&exporter.list(&mut provider))?;
                        RunState::Done
                    } else {
                        let pb = progress_bar(0);
                        let summary = exporter.run(&mut provider, &pb);
                        pb.finish_with_message("Done");
                        summary.log();
                        RunState::Finalizing(roots, summary)
                    }
                }

                RunState::Finalizing(roots, summary) => {
                    let path = manifest_path(&roots.content, &self.config.profile.manifest_name);
                    manifest.flush(&path)?;
                    info!(
                        "Wrote all created content to {} in root of project.",
                        self.config.profile.manifest_name
                    );
                    report.summary = Some(summary);
                    report.manifest = Some(path);
                    RunState::Done
                }

                RunState::Done => break,
            };
        }

        Ok(report)
    }

    /// `Ok(None)` when the operator gives up
    fn select_roots(&mut self) -> Result<Option<Roots>> {
        let paks = match self.paks.take() {
            Some(path) => path,
            None => match self
                .prompt
                .ask_path("Paks folder of the game install (.../Content/Paks)")
            {
                Some(path) => path,
                None => return Ok(None),
            },
        };
        validate_source(&paks, &self.config.profile)?;
        info!("Selected game path: {}", paks.display());
        self.paks = Some(paks.clone());

        let content = match self.content.take() {
            Some(path) => path,
            None => match self.prompt.ask_path("Content folder of the target project") {
                Some(path) => path,
                None => return Ok(None),
            },
        };
        validate_content(&content)?;
        // Manifest lines are absolute paths
        let content = std::path::absolute(&content)?;
        info!("Selected project path: {}", content.display());
        self.content = Some(content.clone());

        Ok(Some(Roots { paks, content }))
    }

    fn index(&mut self, roots: &Roots, guid: KeyGuid, key: &AesKey) -> Result<O::Provider> {
        let mut provider = self.opener.open(&roots.paks, &self.config.profile)?;
        provider.submit_key(guid, key)?;

        let entries = provider.entries();
        if entries.is_empty() {
            return Err(Error::SignatureMismatch("archive has no entries".to_string()));
        }

        verify_project(&mut provider, &entries, &self.config.profile)?;
        info!("Indexed {} entries", entries.len());
        Ok(provider)
    }

    fn remember(&mut self, roots: &Roots) {
        let Some(path) = &self.options.config_path else {
            return;
        };

        self.config.paks_dir = Some(roots.paks.clone());
        self.config.content_dir = Some(roots.content.clone());
        if let Err(e) = self.config.save_to(path) {
            warn!("Could not remember selected folders: {:#}", e);
        }
    }

    fn print_listing(&self, listed: &[(legacy_export::ArchiveEntry, Verdict)]) -> Result<()> {
        if self.options.json {
            let rows: Vec<ListedEntry> = listed
                .iter()
                .map(|(entry, verdict)| ListedEntry {
                    path: &entry.path,
                    verdict: *verdict,
                })
                .collect();
            let json = serde_json::to_string_pretty(&rows).map_err(std::io::Error::other)?;
            println!("{}", json);
        } else {
            for (entry, verdict) in listed {
                match verdict {
                    Verdict::Eligible => println!("export  {}", entry.path),
                    Verdict::Skip(reason) => println!("skip    {} ({})", entry.path, reason),
                }
            }
        }

        let eligible = listed.iter().filter(|(_, v)| v.is_eligible()).count();
        info!("{} of {} entries would be exported", eligible, listed.len());
        Ok(())
    }
}
