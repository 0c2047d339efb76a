//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Flatten element trees into keyed records and rebuild them
#[derive(Parser, Debug)]
#[command(name = "unflattened")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Additional config file, layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flatten a nested element document into keyed records
    Flatten {
        /// Nested element document (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Write records here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Rebuild nested documents from keyed records
    Unflatten {
        /// Flat record file (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Print a tree view instead of TOML
        #[arg(short, long)]
        tree: bool,
        /// Show node keys in the tree view
        #[arg(short, long, requires = "tree")]
        keys: bool,
        /// Write the document here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath, conflicts_with = "tree")]
        output: Option<PathBuf>,
    },

    /// Show a nested element document as a tree
    Tree {
        /// Nested element document (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Show the keys that flattening would assign
        #[arg(short, long)]
        keys: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print effective settings as TOML
    Show,
    /// Print the global config file location
    Path,
}
