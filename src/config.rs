use crate::core::get_config_dir;
use serde::Deserialize;
use std::path::PathBuf;

/// Runtime configuration for `lqtsd`, layered from defaults, an optional
/// TOML file, a `.env` file, and `LQTS_`-prefixed environment variables
/// (highest precedence last).
#[derive(Deserialize, Debug, Clone)]
pub struct Configuration {
    #[serde(default = "default_ip_address")]
    pub ip_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub ssl_cert: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_queue_file")]
    pub queue_file: PathBuf,
    #[serde(default = "default_nworkers")]
    pub nworkers: u32,
    #[serde(default = "default_completed_limit")]
    pub completed_limit: usize,
    #[serde(default)]
    pub resume_on_start_up: bool,
}

fn default_ip_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_queue_file() -> PathBuf {
    home_relative("lqts.queue.txt")
}

fn default_nworkers() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

fn default_completed_limit() -> usize {
    1000
}

fn home_relative(file_name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(file_name)
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            ip_address: default_ip_address(),
            port: default_port(),
            ssl_cert: None,
            log_file: None,
            queue_file: default_queue_file(),
            nworkers: default_nworkers(),
            completed_limit: default_completed_limit(),
            resume_on_start_up: false,
        }
    }
}

/// Loads configuration layering, in increasing precedence:
/// 1. built-in defaults
/// 2. `~/.config/lqts/lqts.toml` (or `$XDG_CONFIG_HOME/lqts/lqts.toml`)
/// 3. an explicit `--config` file, if given
/// 4. a `.env` file in the current directory, if present
/// 5. `LQTS_*` environment variables
pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration, config::ConfigError> {
    let _ = dotenvy::dotenv();

    let mut config_vec = vec![];

    if let Ok(default_config_path) = get_config_dir().map(|d| d.join("lqts.toml")) {
        if default_config_path.exists() {
            config_vec.push(default_config_path);
        }
    }

    if let Some(config_path) = config_path {
        if config_path.exists() {
            config_vec.push(config_path.clone());
        } else {
            eprintln!("Warning: Config file {config_path:?} not found.");
        }
    }

    let settings = config::Config::builder();
    let settings = config_vec.iter().fold(settings, |s, path| {
        s.add_source(config::File::from(path.as_path()))
    });

    settings
        .add_source(
            config::Environment::with_prefix("LQTS")
                .separator("_")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Configuration::default();
        assert_eq!(cfg.ip_address, "127.0.0.1");
        assert_eq!(cfg.port, 9200);
        assert_eq!(cfg.completed_limit, 1000);
        assert!(!cfg.resume_on_start_up);
        assert!(cfg.nworkers >= 1);
    }
}
