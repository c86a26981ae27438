use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use inverter_client::{ClientConfig, RUNTIME_DATA_REGISTERS};
use telemetry_parser::{resolve_timezone, DEFAULT_TIMEZONE};

/// Header, byte count and CRC around a read reply.
const READ_REPLY_OVERHEAD: usize = 7;
const MIN_READ_BUFFER: usize = RUNTIME_DATA_REGISTERS as usize * 2 + READ_REPLY_OVERHEAD;

#[derive(Clone, Debug)]
pub struct StatusConfig {
    pub inverter: ClientConfig,
    pub timezone: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            inverter: ClientConfig::default(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl StatusConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(config_path: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = load_file_config(config_path.as_deref())? {
            apply_file_config(&mut config, file_config);
        }

        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inverter.host.trim().is_empty() {
            anyhow::bail!("inverter.host must be non-empty");
        }
        if self.inverter.port == 0 {
            anyhow::bail!("inverter.port must be between 1 and 65535");
        }
        if self.inverter.timeout_ms == 0 {
            anyhow::bail!("inverter.timeout_ms must be >= 1");
        }
        if self.inverter.max_attempts == 0 {
            anyhow::bail!("inverter.max_attempts must be >= 1");
        }
        if self.inverter.read_buffer_size < MIN_READ_BUFFER {
            anyhow::bail!("inverter.read_buffer_size must be >= {MIN_READ_BUFFER}");
        }
        resolve_timezone(&self.timezone)
            .with_context(|| format!("telemetry.timezone `{}`", self.timezone))?;
        Ok(())
    }
}

fn apply_env_overrides(config: &mut StatusConfig) {
    if let Ok(value) = env::var("INVERTER_HOST") {
        config.inverter.host = value;
    }

    if let Some(port) = parse_env_u16("INVERTER_PORT") {
        config.inverter.port = port;
    }

    if let Some(timeout_ms) = parse_env_u64("INVERTER_TIMEOUT_MS") {
        config.inverter.timeout_ms = timeout_ms;
    }

    if let Some(max_attempts) = parse_env_usize("INVERTER_MAX_ATTEMPTS") {
        config.inverter.max_attempts = max_attempts;
    }

    if let Ok(value) = env::var("INVERTER_TIMEZONE") {
        config.timezone = value;
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    inverter: Option<ClientConfig>,
    telemetry: Option<FileTelemetryConfig>,
}

#[derive(Debug, Deserialize)]
struct FileTelemetryConfig {
    timezone: Option<String>,
}

fn load_file_config(config_path: Option<&str>) -> Result<Option<FileConfig>> {
    let path = match config_path {
        Some(path) => path.to_string(),
        None => match env::var("INVERTER_CONFIG") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("read config file {path}"))?;
    let ext = Path::new(&path).extension().and_then(|value| value.to_str());

    let config = match ext {
        Some("json") => serde_json::from_str(&content).context("parse json config")?,
        _ => toml::from_str(&content).context("parse toml config")?,
    };

    Ok(Some(config))
}

fn apply_file_config(config: &mut StatusConfig, file: FileConfig) {
    if let Some(inverter) = file.inverter {
        config.inverter = inverter;
    }

    if let Some(timezone) = file.telemetry.and_then(|telemetry| telemetry.timezone) {
        config.timezone = timezone;
    }
}

fn parse_env_u16(key: &str) -> Option<u16> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
