//! CLI argument definitions for legacy-export

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "legacy-export")]
#[command(about = "Export source assets from legacy Unreal paks into a project Content folder")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Paks directory of the game install (.../PortalWars/Content/Paks)
    #[arg(short, long, env = "LEGACY_EXPORT_PAKS")]
    pub paks: Option<PathBuf>,

    /// Content directory of the target project
    #[arg(short, long, env = "LEGACY_EXPORT_CONTENT")]
    pub content: Option<PathBuf>,

    /// AES key (hex) used to unlock the paks
    #[arg(long, env = "LEGACY_EXPORT_AES_KEY", hide_env_values = true)]
    pub aes_key: Option<String>,

    /// Worker threads for writing files (default: available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Attempts at selecting valid roots before giving up
    #[arg(long, default_value = "3")]
    pub max_attempts: u32,

    /// Never prompt; invalid or missing roots end the run
    #[arg(long)]
    pub no_prompt: bool,

    /// Classify entries and list them without writing anything
    #[arg(short, long)]
    pub list: bool,

    /// With --list, print JSON instead of one line per entry
    #[arg(long, requires = "list")]
    pub json: bool,

    /// Config file (default: <config dir>/legacy-export/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Set or show remembered defaults
    Configure {
        /// Remember this Paks directory
        #[arg(long)]
        paks: Option<PathBuf>,
        /// Remember this project Content directory
        #[arg(long)]
        content: Option<PathBuf>,
        /// Remember this AES key
        #[arg(long)]
        aes_key: Option<String>,
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_export_flags() {
        let args = Args::try_parse_from([
            "legacy-export",
            "--paks",
            "/g/PortalWars/Content/Paks",
            "--content",
            "/p/Content",
            "--no-prompt",
            "-j",
            "4",
        ])
        .unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.jobs, Some(4));
        assert_eq!(args.max_attempts, 3);
        assert!(args.no_prompt);
    }

    #[test]
    fn test_json_requires_list() {
        assert!(Args::try_parse_from(["legacy-export", "--json"]).is_err());
        assert!(Args::try_parse_from(["legacy-export", "--list", "--json"]).is_ok());
    }

    #[test]
    fn test_parse_configure() {
        let args =
            Args::try_parse_from(["legacy-export", "configure", "--show"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Configure { show: true, .. })
        ));
    }
}
