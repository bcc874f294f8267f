//! legacy-export - copy source assets out of legacy Unreal paks into a project

use anyhow::Result;
use clap::Parser;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod configure;
#[cfg(feature = "uasset")]
mod exports;
mod pak;
mod prompt;
mod roots;
mod session;
mod signature;

use cli::{Args, Commands};
use config::Config;
use prompt::{NoPrompt, Prompt, TerminalPrompt};
use session::{PakOpener, RunReport, Session, SessionOptions};

fn init_tracing(verbose: bool) {
    // The library and the binary share the `legacy_export` target
    let default = if verbose {
        "legacy_export=debug"
    } else {
        "legacy_export=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    init_tracing(args.verbose);

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => Config::config_path()?,
    };

    if let Some(Commands::Configure {
        paks,
        content,
        aes_key,
        show,
    }) = args.command.take()
    {
        return configure::handle(&config_path, paks, content, aes_key, show);
    }

    let config = Config::load_from(&config_path)?;
    let interactive = !args.no_prompt && std::io::stdin().is_terminal();

    let result = if interactive {
        export(&args, config, config_path, TerminalPrompt)
    } else {
        export(&args, config, config_path, NoPrompt)
    };

    match result {
        Ok(report) => {
            if report
                .summary
                .as_ref()
                .is_some_and(|summary| summary.aborted.is_some())
            {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e @ legacy_export::Error::AttemptsExhausted(_)) => {
            error!("{}", e);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

fn export<Q: Prompt>(
    args: &Args,
    config: Config,
    config_path: PathBuf,
    prompt: Q,
) -> legacy_export::Result<RunReport> {
    let options = SessionOptions {
        max_attempts: args.max_attempts.max(1),
        jobs: args.jobs.unwrap_or_else(legacy_export::default_jobs),
        list: args.list,
        json: args.json,
        aes_key: args
            .aes_key
            .clone()
            .unwrap_or_else(|| config.effective_aes_key().to_string()),
        key_guid: config.profile.key_guid.clone(),
        config_path: Some(config_path),
    };

    let paks = args.paks.clone().or_else(|| config.paks_dir.clone());
    let content = args.content.clone().or_else(|| config.content_dir.clone());

    Session::new(PakOpener, prompt, config, options, paks, content).run()
}
