use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    bank: BankSettings,
    attempt: AttemptSettings,
    storage: StorageSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct BankSettings {
    pub path: String,
    pub exam_size: usize,
}

#[derive(Debug, Clone)]
pub struct AttemptSettings {
    pub advance_delay_ms: u64,
    pub allow_deselect: bool,
}

impl AttemptSettings {
    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self { advance_delay_ms: 1000, allow_deselect: false }
    }
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bank_path = env_or_default("PREP_QUESTION_BANK_PATH", "resources/questions.json");
        let exam_size = parse_usize("PREP_EXAM_SIZE", env_or_default("PREP_EXAM_SIZE", "25"))?;

        let advance_delay_ms = parse_u64(
            "PREP_ADVANCE_DELAY_MS",
            env_or_default("PREP_ADVANCE_DELAY_MS", "1000"),
        )?;
        let allow_deselect =
            env_optional("PREP_ALLOW_DESELECT").map(|value| parse_bool(&value)).unwrap_or(false);

        let data_dir = env_or_default("PREP_DATA_DIR", "data");

        let log_level = env_or_default("PREP_LOG_LEVEL", "info");
        let json = env_optional("PREP_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            bank: BankSettings { path: bank_path, exam_size },
            attempt: AttemptSettings { advance_delay_ms, allow_deselect },
            storage: StorageSettings { data_dir },
            telemetry: TelemetrySettings { log_level, json },
        };

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bank.exam_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PREP_EXAM_SIZE",
                value: self.bank.exam_size.to_string(),
            });
        }
        Ok(())
    }

    pub fn bank(&self) -> &BankSettings {
        &self.bank
    }

    pub fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}
