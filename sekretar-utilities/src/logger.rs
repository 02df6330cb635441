use std::{env, time::SystemTime};

use log::info;
use sekretar_models::errors::SendableError;

const LOG_FILE: &str = "sekretar.log";

/// Fern dispatch to stdout plus the daemon log file. `level` is the global
/// floor (Debug with `--verbose`, which also surfaces sqlx statement logs);
/// the HTTP client internals stay capped so verbose runs remain readable.
pub fn setup_logger(level: log::LevelFilter) -> Result<(), SendableError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(fern::log_file(LOG_FILE)?)
        .apply()?;
    Ok(())
}

pub fn print_env() -> std::io::Result<()> {
    let path = env::current_dir()?;
    info!("The current directory is {}", path.display());
    Ok(())
}
