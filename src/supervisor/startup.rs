//! One restart: config check → key directory cleanup → mods → allowed mods →
//! command → spawn.

use std::path::Path;

use super::error::StartupError;
use super::process::Launcher;
use crate::command::CommandBuilder;
use crate::config::{ConfigStore, ServerConfig, WatchdogSettings};
use crate::mods::{self, keys, LoadedMods, StagingReport};

/// Work dispatched by the supervisor once the grace delay has elapsed.
/// Runs on the blocking pool, so implementations may do synchronous I/O.
pub trait StartupTask: Send + Sync + 'static {
    fn run(&self) -> Result<(), StartupError>;
}

/// The full startup sequence against the real filesystem.
pub struct ServerStartup<L> {
    store: ConfigStore,
    builder: CommandBuilder,
    preserved_keys: Vec<String>,
    launcher: L,
}

impl<L: Launcher> ServerStartup<L> {
    pub fn new(settings: &WatchdogSettings, launcher: L) -> Self {
        Self {
            store: ConfigStore::new(settings.config_path.clone()),
            builder: CommandBuilder::new(&settings.server_executable),
            preserved_keys: settings.preserved_keys.clone(),
            launcher,
        }
    }

    /// Run every step up to (not including) the spawn and return the command.
    pub fn prepare(&self) -> Result<String, StartupError> {
        tracing::info!("Checking essential files...");
        let config = self.store.load()?;

        let server_path = Path::new(&config.server_path);
        keys::clean_key_dir(&keys::server_keys_dir(server_path), &self.preserved_keys);

        let (loaded, _) = stage_mods(&config);

        let command = self.builder.build(&config, loaded.use_mods(), &loaded.mods);
        tracing::debug!("Launch command: {}", command);
        tracing::info!("Starting {}", config.name);
        Ok(command)
    }
}

/// Read both manifests and stage their keys. Returns the load list and the
/// combined staging report of both manifests.
fn stage_mods(config: &ServerConfig) -> (LoadedMods, StagingReport) {
    let server_path = Path::new(&config.server_path);
    let mods_root = Path::new(&config.mods_path);

    let loaded = mods::load_mods(server_path, mods_root, Path::new(&config.mod_list_path));
    let mut staged = loaded.staging.clone();
    if let Some(allowed) =
        mods::load_allowed_mods(server_path, mods_root, Path::new(&config.allowed_mod_list_path))
    {
        staged.merge(allowed);
    }

    if staged.failed.is_empty() {
        tracing::info!("Key staging done: {} keys copied", staged.copied.len());
    } else {
        tracing::warn!(
            "Key staging done: {} keys copied, {} failed",
            staged.copied.len(),
            staged.failed.len()
        );
    }
    if !staged.without_keys.is_empty() {
        tracing::info!("Mods without keys: {}", staged.without_keys.join(", "));
    }
    (loaded, staged)
}

impl<L: Launcher + 'static> StartupTask for ServerStartup<L> {
    fn run(&self) -> Result<(), StartupError> {
        let command = self.prepare()?;
        self.launcher.launch(&command)
    }
}
