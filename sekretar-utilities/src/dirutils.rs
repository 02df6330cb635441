use std::env;

use log::info;
use sekretar_models::errors::{RuntimeError, SendableError};

pub fn set_exe_dir_as_cwd() -> Result<(), SendableError> {
    let exe_path = env::current_exe()?;
    let exe_dir = exe_path.parent().ok_or_else(|| {
        RuntimeError::new(
            "startup.no_exe_dir",
            "Executable path has no parent directory",
        )
    })?;
    env::set_current_dir(exe_dir)?;
    let cwd = env::current_dir()?;
    info!("Current working directory: {:?}", cwd);
    Ok(())
}
