use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::client::{ClientError, GenerateFuture, GenerativeClient, RawResult};
use super::prompt::{GenerateRequest, ToolDeclaration};
use crate::config::ConfigError;
use crate::config_env::{optional_trimmed_env, parse_u64_env, process_env};
use crate::conversation::Role;
use crate::credentials::Credential;

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    pub api_base_url: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl GeminiClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(process_env)
    }

    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            api_base_url: optional_trimmed_env(&lookup, "ASSISTANT_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            model: optional_trimmed_env(&lookup, "ASSISTANT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_ms: parse_u64_env(&lookup, "ASSISTANT_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.api_base_url).map_err(|err| {
            ConfigError::InvalidConfiguration(format!("ASSISTANT_API_BASE_URL is not a url: {err}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidConfiguration(
                "ASSISTANT_API_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.model.trim().is_empty() || self.model.contains('/') {
            return Err(ConfigError::InvalidConfiguration(format!(
                "invalid model name '{}'",
                self.model
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "ASSISTANT_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Error)]
pub enum GeminiClientBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build generative http client: {0}")]
    HttpClient(String),
}

/// `generateContent` over HTTPS. Holds no per-conversation state.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GeminiClientBuildError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| GeminiClientBuildError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    async fn send_once(
        &self,
        credential: &Credential,
        request: &GenerateRequest,
    ) -> Result<RawResult, ClientError> {
        let started_at = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, credential.expose())
            .json(&wire_body(request))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ClientError::Timeout
                } else if err.is_connect() {
                    ClientError::Transport("connect_failed".to_string())
                } else {
                    ClientError::Transport("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                ClientError::Timeout
            } else {
                ClientError::Transport("response_body_read_failed".to_string())
            }
        })?;
        debug!(
            status = status.as_u16(),
            latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "generative service responded"
        );

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                reason: parse_provider_error_reason(&body),
            });
        }

        serde_json::from_str::<RawResult>(&body)
            .map_err(|_| ClientError::InvalidPayload("response_json_parse_failed".to_string()))
    }
}

impl GenerativeClient for GeminiClient {
    fn generate<'a>(
        &'a self,
        credential: &'a Credential,
        request: &'a GenerateRequest,
    ) -> GenerateFuture<'a> {
        Box::pin(self.send_once(credential, request))
    }
}

fn wire_body(request: &GenerateRequest) -> Value {
    let contents = request
        .turns
        .iter()
        .map(|turn| {
            json!({
                "role": wire_role(turn.role),
                "parts": [ { "text": turn.content } ]
            })
        })
        .collect::<Vec<_>>();

    let mut body = json!({
        "systemInstruction": {
            "parts": [ { "text": request.system_instruction } ]
        },
        "contents": contents,
    });

    if !request.tools.is_empty() {
        body["tools"] = Value::Array(
            request
                .tools
                .iter()
                .map(|tool| match tool {
                    ToolDeclaration::Search => json!({ "googleSearch": {} }),
                    ToolDeclaration::Maps => json!({ "googleMaps": {} }),
                })
                .collect(),
        );
    }
    if let Some(bias) = request.retrieval_bias {
        body["toolConfig"] = json!({
            "retrievalConfig": {
                "latLng": { "latitude": bias.lat, "longitude": bias.lng }
            }
        });
    }
    if let Some(temperature) = request.temperature {
        body["generationConfig"] = json!({ "temperature": temperature });
    }

    body
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Pulls a machine-readable reason out of a Google API error envelope:
/// the first `details[].reason`, else `error.status`.
fn parse_provider_error_reason(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        status: Option<String>,
        #[serde(default)]
        details: Vec<ProviderErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetail {
        reason: Option<String>,
    }

    let details = serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()?
        .error?;
    details
        .details
        .into_iter()
        .find_map(|detail| detail.reason)
        .or(details.status)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GeminiClientConfig, parse_provider_error_reason, wire_body};
    use crate::config::{ConfigError, SessionConfig, ToolsEnabled};
    use crate::config_env::map_lookup;
    use crate::conversation::{HistoryEntry, Role};
    use crate::grounding::GroundingHint;
    use crate::llm::prompt::build_request;

    #[test]
    fn wire_body_maps_roles_tools_and_bias() {
        let config = SessionConfig::builder("persona")
            .tools(ToolsEnabled {
                search: true,
                maps: true,
            })
            .sampling_temperature(Some(0.5))
            .build()
            .expect("valid config");
        let history = vec![
            HistoryEntry {
                role: Role::User,
                text: "Bonjour".to_string(),
            },
            HistoryEntry {
                role: Role::Assistant,
                text: "Bonjour !".to_string(),
            },
        ];
        let request = build_request(
            &config,
            &history,
            "Où consulter ?",
            Some(GroundingHint {
                latitude: 48.5,
                longitude: 0.25,
            }),
        );

        let body = wire_body(&request);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Où consulter ?");
        assert_eq!(
            body["tools"],
            json!([{ "googleSearch": {} }, { "googleMaps": {} }])
        );
        assert_eq!(
            body["toolConfig"]["retrievalConfig"]["latLng"],
            json!({ "latitude": 48.5, "longitude": 0.25 })
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn wire_body_omits_unused_sections() {
        let config = SessionConfig::builder("persona")
            .build()
            .expect("valid config");
        let body = wire_body(&build_request(&config, &[], "Bonjour", None));
        assert!(body.get("tools").is_none());
        assert!(body.get("toolConfig").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn error_reason_prefers_detail_reason() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [ { "reason": "API_KEY_INVALID" } ]
            }
        })
        .to_string();
        assert_eq!(
            parse_provider_error_reason(&body),
            Some("API_KEY_INVALID".to_string())
        );

        let body = json!({ "error": { "status": "RESOURCE_EXHAUSTED" } }).to_string();
        assert_eq!(
            parse_provider_error_reason(&body),
            Some("RESOURCE_EXHAUSTED".to_string())
        );
        assert_eq!(parse_provider_error_reason("<html>bad gateway</html>"), None);
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let mut config = GeminiClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );

        config.api_base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        config = GeminiClientConfig {
            timeout_ms: 0,
            ..GeminiClientConfig::default()
        };
        assert!(config.validate().is_err());

        config = GeminiClientConfig {
            model: "models/x".to_string(),
            ..GeminiClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_env_falls_back_to_defaults() {
        let config = GeminiClientConfig::from_env_with(map_lookup(&[("ASSISTANT_MODEL", "  ")]))
            .expect("defaults should validate");
        assert_eq!(config.api_base_url, GeminiClientConfig::default().api_base_url);
        assert_eq!(config.model, "gemini-3-flash-preview");
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn from_env_reads_overrides_and_rejects_malformed_timeout() {
        let config = GeminiClientConfig::from_env_with(map_lookup(&[
            ("ASSISTANT_API_BASE_URL", "http://127.0.0.1:8080/v1beta"),
            ("ASSISTANT_MODEL", "gemini-2.5-flash"),
            ("ASSISTANT_TIMEOUT_MS", "1500"),
        ]))
        .expect("overrides should validate");
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080/v1beta");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.timeout_ms, 1_500);

        let err = GeminiClientConfig::from_env_with(map_lookup(&[("ASSISTANT_TIMEOUT_MS", "soon")]))
            .expect_err("malformed timeout should fail");
        assert!(matches!(err, ConfigError::ParseNumber(key) if key == "ASSISTANT_TIMEOUT_MS"));

        assert!(matches!(
            GeminiClientConfig::from_env_with(map_lookup(&[("ASSISTANT_TIMEOUT_MS", "0")])),
            Err(ConfigError::InvalidConfiguration(_))
        ));
    }
}
