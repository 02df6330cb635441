use std::sync::Arc;

use interfaces::ActionStoreImpl;
use log::info;
use sekretar_models::errors::SendableError;

pub mod in_memory;
pub mod interfaces;
pub mod postgres;
pub mod sqlite;

pub async fn initialize_store(store: &Arc<impl ActionStoreImpl>) -> Result<(), SendableError> {
    info!("Initializing scheduled action store");
    store.init_schema().await?;
    Ok(())
}
