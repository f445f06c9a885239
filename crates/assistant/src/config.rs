use std::time::Duration;

use thiserror::Error;

use crate::config_env::{parse_bool_env, parse_optional_f64_env, process_env};
use crate::grounding::{DEFAULT_LOCATE_TIMEOUT, GroundingHint};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid number in env var {0}")]
    ParseNumber(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

/// Loads `.env` from the working directory when present.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolsEnabled {
    pub search: bool,
    pub maps: bool,
}

impl ToolsEnabled {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(process_env)
    }

    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            search: parse_bool_env(&lookup, "ASSISTANT_TOOLS_SEARCH", false)?,
            maps: parse_bool_env(&lookup, "ASSISTANT_TOOLS_MAPS", false)?,
        })
    }

    pub const fn any(self) -> bool {
        self.search || self.maps
    }
}

/// Operator-pinned coordinates from `ASSISTANT_LATITUDE`/`ASSISTANT_LONGITUDE`.
/// Both or neither must be set.
pub fn fixed_location_from_env() -> Result<Option<GroundingHint>, ConfigError> {
    fixed_location_from_env_with(process_env)
}

pub fn fixed_location_from_env_with<F>(lookup: F) -> Result<Option<GroundingHint>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let latitude = parse_optional_f64_env(&lookup, "ASSISTANT_LATITUDE")?;
    let longitude = parse_optional_f64_env(&lookup, "ASSISTANT_LONGITUDE")?;
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            let hint = GroundingHint {
                latitude,
                longitude,
            };
            if !hint.is_valid() {
                return Err(ConfigError::InvalidConfiguration(
                    "ASSISTANT_LATITUDE/ASSISTANT_LONGITUDE are out of range".to_string(),
                ));
            }
            Ok(Some(hint))
        }
        (None, None) => Ok(None),
        _ => Err(ConfigError::InvalidConfiguration(
            "ASSISTANT_LATITUDE and ASSISTANT_LONGITUDE must be set together".to_string(),
        )),
    }
}

/// What `reset()` leaves behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    Empty,
    #[default]
    ReseedGreeting,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionConfigError {
    #[error("persona instruction must not be empty")]
    EmptyPersona,
    #[error("sampling temperature must be within 0.0..=2.0, got {0}")]
    TemperatureOutOfRange(f32),
}

/// Per-session settings, fixed once the session exists.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub persona_instruction: String,
    pub greeting: Option<String>,
    pub tools: ToolsEnabled,
    pub sampling_temperature: Option<f32>,
    pub reset_policy: ResetPolicy,
    pub locate_timeout: Duration,
}

impl SessionConfig {
    pub fn builder(persona_instruction: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: SessionConfig {
                persona_instruction: persona_instruction.into(),
                greeting: None,
                tools: ToolsEnabled::default(),
                sampling_temperature: None,
                reset_policy: ResetPolicy::default(),
                locate_timeout: DEFAULT_LOCATE_TIMEOUT,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        self.config.greeting = if greeting.trim().is_empty() {
            None
        } else {
            Some(greeting)
        };
        self
    }

    pub fn tools(mut self, tools: ToolsEnabled) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn sampling_temperature(mut self, temperature: Option<f32>) -> Self {
        self.config.sampling_temperature = temperature;
        self
    }

    pub fn reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.config.reset_policy = policy;
        self
    }

    pub fn locate_timeout(mut self, timeout: Duration) -> Self {
        self.config.locate_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
        if self.config.persona_instruction.trim().is_empty() {
            return Err(SessionConfigError::EmptyPersona);
        }
        if let Some(temperature) = self.config.sampling_temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(SessionConfigError::TemperatureOutOfRange(temperature));
        }
        Ok(self.config)
    }
}
