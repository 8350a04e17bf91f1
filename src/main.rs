//! genfiles - run documentation generation scripts and build the site.

use anyhow::Result;
use clap::Parser;
use genfiles::{
    RhaiRunner,
    build::{build_site, list_files},
    cli::{Cli, Commands},
    config::SiteConfig,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { clean, .. } => {
            build_site(&config, Box::new(RhaiRunner), *clean).map(|_| ())
        }
        Commands::List { .. } => list_files(&config, Box::new(RhaiRunner)).map(|_| ()),
    }
}
