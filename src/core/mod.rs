pub mod api;
pub mod job;
pub mod pool;
pub mod queue;
pub mod resources;
pub mod snapshot;
pub mod work_item;

use std::path::PathBuf;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("failed to get config directory"))
        .map(|p| p.join("lqts"))
}

pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("failed to get data directory"))
        .map(|p| p.join("lqts"))
}
