//! TOML + XDG config loading for `balsa-pcm.toml`, mirroring the teacher's
//! `bark.toml` lookup: current directory first, then the XDG config dirs.

use std::env;
use std::path::Path;

use serde::Deserialize;

#[derive(Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: Daemon,
    #[serde(default)]
    pub device: Device,
}

#[derive(Deserialize, Default)]
pub struct Daemon {
    pub interface: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct Device {
    pub address: Option<String>,
    pub profile: Option<String>,
    pub period_size: Option<u64>,
    pub periods: Option<u32>,
}

fn set_env<T: ToString>(name: &str, value: T) {
    env::set_var(name, value.to_string());
}

fn set_env_option<T: ToString>(name: &str, value: Option<T>) {
    if let Some(value) = value {
        set_env(name, value)
    }
}

pub fn load_into_env(config: &Config) {
    set_env_option("BALSA_DAEMON_INTERFACE", config.daemon.interface.as_ref());
    set_env_option("BALSA_DEVICE_ADDRESS", config.device.address.as_ref());
    set_env_option("BALSA_DEVICE_PROFILE", config.device.profile.as_ref());
    set_env_option("BALSA_DEVICE_PERIOD_SIZE", config.device.period_size);
    set_env_option("BALSA_DEVICE_PERIODS", config.device.periods);
}

fn load_file(path: &Path) -> Option<Config> {
    log::debug!("looking for config in {}", path.display());

    let contents = std::fs::read_to_string(path).ok()?;

    match toml::from_str(&contents) {
        Ok(config) => {
            log::info!("reading config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::error!("error reading config: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn read() -> Option<Config> {
    if let Some(config) = load_file(Path::new("balsa-pcm.toml")) {
        return Some(config);
    }

    let dirs = xdg::BaseDirectories::new().ok()?;
    if let Some(config) = dirs.find_config_file("balsa-pcm.toml") {
        return load_file(&config);
    }

    None
}
