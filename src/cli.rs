//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands::{self, CacheArgs, Context};
use palletfs::output::OutputConfig;

/// palletfs - Inspect and export versioned pallets of package definitions
#[derive(Parser, Debug)]
#[command(name = "palletfs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// The root directory of the pallet cache.
    ///
    /// Defaults to the system cache directory (`~/.cache/palletfs` on Linux,
    /// `~/Library/Caches/palletfs` on macOS).
    #[arg(long, global = true, value_name = "DIR", env = "PALLETFS_CACHE")]
    cache_root: Option<PathBuf>,

    /// Serve a local pallet checkout in place of the listed versions,
    /// as `DIR=VERSION[,VERSION...]`. May be repeated.
    #[arg(long = "override", global = true, value_name = "DIR=VERSIONS")]
    overrides: Vec<String>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List pallets in the cache
    LsPallets(commands::ls::LsArgs),

    /// List packages in the cache
    LsPkgs(commands::ls::LsArgs),

    /// Show a package's declaration and location
    ShowPkg(commands::show::ShowPkgArgs),

    /// Show the merged file tree of a pallet, with imports annotated
    Tree(commands::tree::TreeArgs),

    /// Write the merged file tree of a pallet to a directory
    Export(commands::export::ExportArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // A logger may already be installed when running under tests.
        let _ = env_logger::Builder::new()
            .filter_level(self.log_level)
            .try_init();

        let output = OutputConfig::from_env_and_flag(&self.color);
        let cache = CacheArgs {
            cache_root: self.cache_root,
            overrides: self.overrides,
        }
        .build()?;
        let ctx = Context { cache, output };

        match self.command {
            Commands::LsPallets(args) => commands::ls::execute_pallets(args, &ctx),
            Commands::LsPkgs(args) => commands::ls::execute_pkgs(args, &ctx),
            Commands::ShowPkg(args) => commands::show::execute(args, &ctx),
            Commands::Tree(args) => commands::tree::execute(args, &ctx),
            Commands::Export(args) => commands::export::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "palletfs",
            "ls-pallets",
            "github.com/org/*",
            "--cache-root",
            "/tmp/cache",
            "--override",
            "/src/repo=v1,v2",
            "--override",
            "/src/other=dev",
        ])
        .unwrap();
        assert_eq!(cli.cache_root, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(cli.overrides, vec!["/src/repo=v1,v2", "/src/other=dev"]);
        match cli.command {
            Commands::LsPallets(args) => assert_eq!(args.pattern, "github.com/org/*"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_log_level_parsed() {
        let cli = Cli::try_parse_from(["palletfs", "--log-level", "debug", "ls-pallets"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Debug);
        let cli = Cli::try_parse_from(["palletfs", "ls-pallets"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Cli::try_parse_from(["palletfs", "--log-level", "loud", "ls-pallets"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_export_requires_destination() {
        let result = Cli::try_parse_from(["palletfs", "export", "github.com/org/repo", "v1"]);
        assert!(result.is_err());
    }
}
