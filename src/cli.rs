//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate documentation files from scripts during a site build
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Docs directory path (relative to project root)
    #[arg(short, long)]
    pub docs: Option<PathBuf>,

    /// Site output directory path (relative to project root)
    #[arg(short, long)]
    pub site: Option<PathBuf>,

    /// Config file name (default: genfiles.toml)
    #[arg(short = 'C', long, default_value = "genfiles.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared generation arguments for Build and List commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenArgs {
    /// Stage generated files in this directory instead of a temporary one
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// Remove the temporary staging directory after the build
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub cleanup: Option<bool>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the scripts and copy the merged docs into the site directory
    Build {
        /// Clean the site directory completely before building
        #[arg(long)]
        clean: bool,

        #[command(flatten)]
        gen_args: GenArgs,
    },

    /// Run the scripts and print the merged file list
    List {
        #[command(flatten)]
        gen_args: GenArgs,
    },
}

impl Cli {
    pub const fn gen_args(&self) -> &GenArgs {
        match &self.command {
            Commands::Build { gen_args, .. } | Commands::List { gen_args } => gen_args,
        }
    }
}
