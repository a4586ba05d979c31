//! `quickql` entry point.
//!
//! # Responsibility
//! - Read settings and flags, run the pipeline, serve until interrupted.
//! - Own the process exit path: any startup failure exits with code 1.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use quickql_core::{
    init_logging, load_and_compose, HandlerContext, RecordStore, RuntimeMode, Settings,
};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "quickql",
    version,
    about = "Compose extension schema fragments into one GraphQL API"
)]
struct Cli {
    /// Extension roots (files or directories); defaults to `demos`
    roots: Vec<String>,
    /// Print the composed SDL and exit
    #[arg(long)]
    print_schema: bool,
    /// Listen host, overrides HOST
    #[arg(long)]
    host: Option<String>,
    /// Listen port, overrides PORT
    #[arg(long)]
    port: Option<u16>,
    /// Directory-name marker to skip while walking, overrides QUICKQL_EXCLUDE
    #[arg(long)]
    exclude: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(marker) = &self.exclude {
            settings.exclude_marker = marker.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("quickql: {err}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut settings);

    if let Err(err) = init_logging(&settings.log_level, settings.log_dir.as_deref()) {
        eprintln!("quickql: {err}");
        return ExitCode::FAILURE;
    }

    let mode = settings.mode;
    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(mode, &err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    info!(
        "event=startup module=cli status=start mode={} roots={}",
        settings.mode.as_str(),
        cli.roots.len()
    );

    let composition = load_and_compose(&settings, cli.roots.as_slice());

    if cli.print_schema {
        let merged = composition
            .merged_schema()
            .context("composed schema does not merge")?;
        print!("{}", merged.to_sdl());
        return Ok(());
    }

    let store = match &settings.data_path {
        Some(path) => RecordStore::open(path)
            .with_context(|| format!("opening record store at {}", path.display()))?,
        None => RecordStore::open_in_memory().context("opening in-memory record store")?,
    };
    let context = HandlerContext::new(Arc::new(store));

    let handle = quickql_server::serve(&composition, &settings.server, context)
        .await
        .context("starting GraphQL server")?;
    info!("Graphql ready at {}", handle.url());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("event=shutdown module=cli status=start");
    handle.shutdown().await;
    Ok(())
}

fn report_failure(mode: RuntimeMode, err: &anyhow::Error) {
    if mode.is_production() {
        error!("event=startup module=cli status=error error={err}");
    } else {
        error!("event=startup module=cli status=error error={err:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use quickql_core::Settings;

    #[test]
    fn flags_override_environment_settings() {
        let cli = Cli::try_parse_from([
            "quickql",
            "demos",
            "extra",
            "--port",
            "4100",
            "--host",
            "0.0.0.0",
            "--exclude",
            "vendor",
        ])
        .expect("valid arguments");
        let mut settings = Settings::from_lookup(|_| None, "/srv/app").expect("settings");
        cli.apply(&mut settings);

        assert_eq!(cli.roots, vec!["demos", "extra"]);
        assert_eq!(settings.server.port, 4100);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.exclude_marker, "vendor");
        assert!(!cli.print_schema);
    }

    #[test]
    fn roots_are_optional() {
        let cli = Cli::try_parse_from(["quickql", "--print-schema"]).expect("valid arguments");
        assert!(cli.roots.is_empty());
        assert!(cli.print_schema);
    }
}
