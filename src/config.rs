use crate::view::Language;
use anyhow::Context;
use serde::Deserialize;
use std::{fs::File, io, path::PathBuf, time::Duration};

/// App configuration. Every field has a default, so the config file is
/// optional. SSH credentials are *not* stored here, see
/// [crate::sink::ssh::SshParams].
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forecast location
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds between weather refreshes
    pub weather_interval: u64,
    /// Milliseconds between main loop ticks
    pub tick_interval: u64,
    /// Seconds to reuse a weather response before asking the API again
    pub cache_ttl: u64,
    pub language: Language,
    /// Logs go here, because the terminal is busy. `null` logs to stderr
    pub log_file: Option<PathBuf>,
    pub mirror: MirrorConfig,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the file, or fall back to defaults if it doesn't
    /// exist. This runs before logging is initialized.
    pub fn load() -> anyhow::Result<Self> {
        let file = match File::open(Self::PATH) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Error opening config file {}",
                    Self::PATH
                ))
            }
        };
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }

    pub fn weather_interval(&self) -> Duration {
        Duration::from_secs(self.weather_interval)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            latitude: 49.4759,
            longitude: 10.9886,
            weather_interval: 300,
            tick_interval: 100,
            cache_ttl: 3600,
            language: Language::default(),
            log_file: Some("weatherclock.log".into()),
            mirror: MirrorConfig::default(),
        }
    }
}

/// Optional second destination for every rendered frame
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MirrorConfig {
    #[default]
    None,
    /// Write each frame to a file on a remote host. Connection parameters
    /// come from the environment
    Ssh {
        #[serde(default = "default_remote_path")]
        remote_path: String,
    },
    /// Write each frame as raw bytes to a serial port
    Serial {
        #[serde(default = "default_serial_port")]
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

fn default_remote_path() -> String {
    "/tmp/display.txt".into()
}

fn default_serial_port() -> String {
    "/dev/ttyAMA0".into()
}

fn default_baud_rate() -> u32 {
    9600
}
