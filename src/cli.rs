use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "ouimap")]
#[command(about = "MAC vendor lookup over the IEEE registries and the macaddress.io database", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// JSON config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub(crate) config: PathBuf,
    /// More log output (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Errors only
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download all sources, then write the enhanced database.
    Update {
        /// Where downloaded sources are kept
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Enhanced database path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Use the files already in the data dir
        #[arg(long)]
        offline: bool,
        /// Output JSON report
        #[arg(long)]
        json: bool,
    },

    /// Enhance a local database from local registry files (no network).
    Enhance {
        /// macaddress.io XML database
        #[arg(long)]
        db: PathBuf,
        /// Registry CSV (repeatable, later files win on conflicts)
        #[arg(short, long = "registry", required = true)]
        registries: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Longest-prefix vendor lookup for one or more MAC addresses.
    Query {
        #[arg(required = true)]
        macs: Vec<String>,
        /// Database to query (default: the enhanced output)
        #[arg(long, conflicts_with = "registries")]
        db: Option<PathBuf>,
        /// Query registry CSVs directly instead of a database
        #[arg(short, long = "registry")]
        registries: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Show what the canonicalizer makes of organization names.
    Canonicalize {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        json: bool,
    },

    /// List configured source URLs and where they are stored locally.
    Sources {
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_with_global_flags() {
        let cli = Cli::try_parse_from([
            "ouimap", "query", "00:11:22:33:44:55", "aabbcc", "-r", "oui.csv", "-vv", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        match cli.command {
            Command::Query {
                macs,
                registries,
                json,
                db,
            } => {
                assert_eq!(macs.len(), 2);
                assert_eq!(registries, vec![PathBuf::from("oui.csv")]);
                assert!(json);
                assert!(db.is_none());
            }
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_query_db_and_registry_conflict() {
        let result = Cli::try_parse_from([
            "ouimap", "query", "001122334455", "--db", "db.xml", "-r", "oui.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_enhance_requires_registry() {
        assert!(Cli::try_parse_from(["ouimap", "enhance", "--db", "db.xml"]).is_err());
    }
}
