//! Runtime settings, read from `netclad.toml` and `NETCLAD_*` environment
//! variables on top of built-in defaults.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::persist::PersistenceMode;
use crate::vocabulary::NETWORK_NS;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3030";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// SQLite file holding snapshots. Without it everything stays in memory.
    pub database: Option<String>,
    pub ontology_namespace: String,
    pub bind_address: String,
    pub log_filter: String,
}

impl Settings {
    pub fn load() -> Result<Settings> {
        Self::from_file("netclad")
    }
    /// `name` is a config file path with or without its extension; a missing
    /// file is not an error.
    pub fn from_file(name: &str) -> Result<Settings> {
        let settings = Config::builder()
            .set_default("ontology_namespace", NETWORK_NS)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("log_filter", "info")?
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("NETCLAD"))
            .build()?;
        Ok(settings.try_deserialize::<Settings>()?)
    }
    pub fn persistence_mode(&self) -> PersistenceMode {
        match &self.database {
            Some(path) if !path.trim().is_empty() => PersistenceMode::File(path.clone()),
            _ => PersistenceMode::InMemory,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database: None,
            ontology_namespace: NETWORK_NS.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            log_filter: "info".to_string(),
        }
    }
}
