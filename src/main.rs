//! scale-snapshot-suite - functional tests for CSI volume snapshots.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Builds the suite from the command values and driver data
//! - Runs the selected cases and prints a summary

use std::process::ExitCode;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use scale_snapshot_suite::config::CommandValues;
use scale_snapshot_suite::{
    Marker, Selection, SnapshotCase, SnapshotSuite, catalog, log_filter, run_selection,
};

#[derive(Parser, Debug)]
#[command(name = "scale-snapshot-suite", version, about)]
struct Cli {
    #[command(flatten)]
    values: CommandValues,

    /// Only run cases with this marker (regression, slow, cg, xfail)
    #[arg(short = 'm', long = "marker")]
    markers: Vec<Marker>,

    /// Only run cases whose name contains this
    #[arg(short = 'k', long = "case")]
    names: Vec<String>,

    /// List the selected cases without running them
    #[arg(long)]
    list: bool,

    /// Delete objects left behind by the selected cases instead of running them
    #[arg(long)]
    purge: bool,

    /// Plain text logs instead of JSON
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.plain {
        tracing_subscriber::fmt().with_env_filter(log_filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(log_filter()).json().init();
    }

    let selection = Selection {
        markers: cli.markers.clone(),
        names: cli.names.clone(),
        run_slow: cli.values.runslow_val,
    };

    if cli.list {
        return list(&cli, &selection);
    }

    info!(namespace = %cli.values.test_namespace, "Starting scale-snapshot-suite");

    let (suite, data) = match SnapshotSuite::from_fixture(&cli.values).await {
        Ok(fixture) => fixture,
        Err(e) => {
            error!(error = %e, "Suite setup failed");
            return ExitCode::FAILURE;
        }
    };
    let cases = catalog(&data);

    if cli.purge {
        let deleted: usize = purge(&suite, &cases, &selection).await;
        println!("{} leftover object(s) deleted", deleted);
        return ExitCode::SUCCESS;
    }

    tokio::select! {
        summary = run_selection(&suite, &cases, &selection) => {
            println!("{}", summary);
            for (name, message) in &summary.failures {
                println!("FAILED {} - {}", name, message);
            }
            if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        _ = signal::ctrl_c() => {
            warn!("Interrupted, objects of the running case may be left behind");
            ExitCode::FAILURE
        }
    }
}

async fn purge(suite: &SnapshotSuite, cases: &[SnapshotCase], selection: &Selection) -> usize {
    let mut deleted = 0;
    for case in cases.iter().filter(|c| selection.selects(c)) {
        deleted += suite.purge(&case.name).await;
    }
    deleted
}

fn list(cli: &Cli, selection: &Selection) -> ExitCode {
    let data = match scale_snapshot_suite::config::DriverData::load(&cli.values.test_config) {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "Cannot read driver data");
            return ExitCode::FAILURE;
        }
    };
    for case in catalog(&data).iter().filter(|c| selection.selects(c)) {
        let markers: Vec<String> = case.markers.iter().map(ToString::to_string).collect();
        println!("{} [{}]", case.name, markers.join(","));
    }
    ExitCode::SUCCESS
}
