//! pgmon - interactive PostgreSQL monitor with saved query tabs.

pub mod app;
pub mod assist;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod event;
pub mod history;
pub mod logging;
pub mod picker;
pub mod profiles;
pub mod runtime;
pub mod store;
pub mod ui;

use clap::Parser;
use cli::Cli;
use color_eyre::eyre::Result;

/// Parse arguments, start logging and run the picker/session loop on a tokio runtime.
pub fn run_cli() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let _guard = match logging::init(cli.log_level.as_deref()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("pgmon: logging disabled: {e}");
            None
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(runtime::run(cli))
}
