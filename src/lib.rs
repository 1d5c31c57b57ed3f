pub mod actuators;
pub mod alert;
pub mod button;
pub mod capture;
pub mod clock;
pub mod db;
pub mod error;
pub mod hardware;
pub mod scheduler;
pub mod settings;
mod utils;

use std::{future::Future, path::PathBuf, sync::Arc};

use anyhow::Result;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use actuators::ActuatorFacade;
use alert::AlertController;
use capture::{build_language_model, CapturePipeline};
use clock::SystemClock;
use db::Database;
use hardware::sim::{console_input, ScriptedSpeech, SimDisplay, SimGpio, SimRemoteLink};
use scheduler::Scheduler;
use settings::Settings;

const CONFIG_ENV: &str = "REMINDME_CONFIG";
const DEBUG_ENV: &str = "REMINDME_DEBUG";
const DEFAULT_CONFIG: &str = "remindme.json";

/// Cancels `shutdown` once `signal` fires. A listener that fails to register
/// leaves the appliance running.
async fn cancel_on_signal<F>(signal: F, shutdown: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Ctrl-C received");
            shutdown.cancel();
        }
        Err(err) => warn!("failed to listen for Ctrl-C, running without it: {err}"),
    }
}

/// Runs the appliance on the console backend until Ctrl-C.
pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let level = if std::env::var(DEBUG_ENV).is_ok_and(|v| v == "1") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    info!("remindme starting up...");

    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let settings = Settings::load(&config_path)?;

    let database = Database::new(settings.database_path.clone())?;
    let pending = database.list_active().await?;
    let archived = database.list_archived().await?;
    info!(
        "Store {}: {} pending, {} archived",
        database.path().display(),
        pending.len(),
        archived.len()
    );

    let gpio = Arc::new(SimGpio::new());
    let display = Arc::new(SimDisplay::new(settings.display.width, settings.display.lines));
    let link = Arc::new(SimRemoteLink::new());
    let speech = Arc::new(ScriptedSpeech::new());

    let shutdown = CancellationToken::new();
    let console = tokio::spawn(console_input(
        gpio.clone(),
        speech.clone(),
        settings.pins.button,
        settings.tick() * 2,
        shutdown.clone(),
    ));

    let actuators = ActuatorFacade::new(gpio.clone(), display, link, &settings);
    let pipeline = CapturePipeline::new(
        speech.clone(),
        speech,
        build_language_model(&settings.llm),
        database.clone(),
        actuators.beeper(),
        settings.capture_beep(),
    );
    let alert = AlertController::new(actuators, database.clone(), settings.alert_duration());
    let scheduler = Scheduler::new(
        Arc::new(SystemClock),
        gpio,
        alert,
        pipeline,
        database,
        &settings,
    );

    let ctrl_c = tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    scheduler.run(shutdown.clone()).await;

    shutdown.cancel();
    ctrl_c.abort();
    if let Err(err) = console.await {
        warn!("console input task failed to join: {err}");
    }

    info!("remindme stopped");
    Ok(())
}
