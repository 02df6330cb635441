use std::env;

use log::info;
use sekretar_models::errors::SendableError;

use crate::{
    dirutils,
    logger::{self, print_env},
};

/// Common process bring-up for the scheduler binaries: pin the working
/// directory to the executable's, wire the logger at the requested level,
/// route panics through it.
pub fn startup(name: &str, log_level: log::LevelFilter) -> Result<(), SendableError> {
    unsafe {
        env::set_var("RUST_BACKTRACE", "1");
    }
    dirutils::set_exe_dir_as_cwd()?;
    logger::setup_logger(log_level)?;
    log_panics::init();

    info!("--- {} ---", name);
    print_env()?;

    Ok(())
}
