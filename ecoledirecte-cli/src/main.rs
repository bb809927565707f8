use std::fs;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use ecoledirecte::{grades, homework, schedule, week::DateWindow, Client};
use ecoledirecte_cli::{detail, homework_options, Cli, Command};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn print(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = Client::new(cli.client_config())?;
    let (mut session, raw) = client.login_with_response(&cli.username, &cli.password)?;

    info!(
        account = session.account().id,
        "connected as {}",
        session.account().username
    );

    if let Some(path) = &cli.snapshot {
        fs::write(path, serde_json::to_vec(&raw)?)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
    }

    match cli.command {
        Command::Schedule { date } => {
            let window = date.map_or_else(DateWindow::current, DateWindow::containing);
            print(&schedule::fetch(&client, &mut session, &window)?)?;
        }
        Command::Homework {
            raw,
            abort_on_decode_error,
        } => {
            let batch = homework::fetch(
                &client,
                &mut session,
                homework_options(raw, abort_on_decode_error),
            )?;

            for failure in &batch.failures {
                warn!(date = %failure.date, subject = %failure.subject, "skipped: {}", failure.error);
            }

            print(&batch.items)?;
        }
        Command::Grades { raw } => {
            print(&grades::fetch(&client, &mut session, detail(raw))?)?;
        }
    }

    Ok(())
}
