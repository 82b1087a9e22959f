use anyhow::{Context, Result};
use tracing::info;

use gridsync_cli::replay::{ReplayReport, replay};
use gridsync_cli::scenario::Scenario;
use gridsync_cli::summary::print_report;

use crate::cli::{CheckArgs, OutputArg, ReplayArgs};

pub fn run_replay(args: &ReplayArgs) -> Result<ReplayReport> {
    let scenario = Scenario::from_path(&args.scenario)?;
    let report = replay(&scenario)?;
    match args.output {
        OutputArg::Table => print_report(&report, args.calls),
        OutputArg::Json => {
            let json = serde_json::to_string_pretty(&report).context("serialize report")?;
            println!("{json}");
        }
    }
    Ok(report)
}

/// Parse the scenario and build its model, without binding an engine.
pub fn run_check(args: &CheckArgs) -> Result<()> {
    let scenario = Scenario::from_path(&args.scenario)?;
    let model = scenario.build_model()?;
    info!(
        columns = model.column_state().len(),
        steps = scenario.steps.len(),
        "scenario is valid"
    );
    println!(
        "{}: {} column(s), {} step(s)",
        args.scenario.display(),
        model.column_state().len(),
        scenario.steps.len()
    );
    Ok(())
}
