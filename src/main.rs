//! flowq command line client

use clap::Parser;
use flowq::cli::Cli;
use flowq::{Credentials, FlowQuerySession, QueryOutcome, telemetry};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.log_level());

    match run(&cli).await {
        Ok(QueryOutcome::Saved {
            job_id,
            path,
            bytes,
        }) => {
            println!(
                "✓ Query {} complete: saved {} bytes to {}",
                job_id,
                bytes,
                path.display()
            );
            ExitCode::SUCCESS
        }
        Ok(QueryOutcome::ResultsUnavailable { job_id, message }) => {
            println!("✗ Query {job_id} completed but results were not retrieved: {message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> flowq::Result<QueryOutcome> {
    let config = cli.resolve_config()?;
    let options = cli.query_options()?;
    let mut session = FlowQuerySession::new(config)?;

    let credentials = Credentials::prompt(cli.username.as_str())?;

    let cancel = CancellationToken::new();
    flowq::cancel_on_signal(cancel.clone());

    session
        .run(credentials, &options, &cli.output, &cancel)
        .await
}
