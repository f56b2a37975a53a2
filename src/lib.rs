pub mod advisory;
pub mod cli;
pub mod cycle;
pub mod db;
pub mod detection;
pub mod reminders;
pub mod settings;
pub mod utils;
pub mod vitals;
pub mod watch;

use anyhow::{Context, Result};
use log::info;
use tokio_util::sync::CancellationToken;

use advisory::StubAdvisor;
use cli::{parse_args, Command, USAGE};
use cycle::{CycleCoordinator, CycleResult};
use db::Database;
use reminders::ReminderDispatcher;
use settings::{default_settings_path, SettingsStore};

pub fn run() -> Result<()> {
    utils::logging::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = parse_args(&arg_refs)?;

    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let settings_store = SettingsStore::new(default_settings_path())?;
    let settings = settings_store.settings();
    info!(
        "carewatch starting (settings: {})",
        settings_store.path().display()
    );

    let database = Database::new(settings.resolve_database_path())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        match command {
            Command::Run => {
                let coordinator =
                    CycleCoordinator::from_settings(database, &settings, Box::new(StubAdvisor));
                let result = coordinator.run_cycle().await?;
                print_result(&result)
            }
            Command::Watch { interval } => {
                let coordinator =
                    CycleCoordinator::from_settings(database, &settings, Box::new(StubAdvisor));
                let cancel_token = CancellationToken::new();
                let shutdown = cancel_token.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Ctrl-C received, stopping after the current cycle");
                        shutdown.cancel();
                    }
                });
                watch::watch_loop(&coordinator, interval, cancel_token, print_result).await?;
                Ok(())
            }
            Command::Mark { row_id } => {
                let outcome = ReminderDispatcher::new(database)
                    .mark_delivered(row_id)
                    .await?;
                println!("reminder {row_id}: {}", outcome.as_str());
                Ok(())
            }
            Command::Help => Ok(()),
        }
    })
}

fn print_result(result: &CycleResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("failed to serialize cycle result")?;
    println!("{json}");
    Ok(())
}
