use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::client::ClientError;
use super::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredential,
    AuthRejected,
    EmptyResponse,
    RateLimited,
    NetworkFailure,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        Self::MissingCredential,
        Self::AuthRejected,
        Self::EmptyResponse,
        Self::RateLimited,
        Self::NetworkFailure,
        Self::Unknown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::AuthRejected => "auth_rejected",
            Self::EmptyResponse => "empty_response",
            Self::RateLimited => "rate_limited",
            Self::NetworkFailure => "network_failure",
            Self::Unknown => "unknown",
        }
    }

    /// Visitor-facing copy, in the assistant's voice.
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::MissingCredential | Self::AuthRejected => {
                "Je ne peux pas vous répondre pour le moment. Vous pouvez joindre Jean-François directement au 09.55.55.44.62 pour échanger de vive voix."
            }
            Self::EmptyResponse => {
                "Les mots me manquent un instant. Pourriez-vous reformuler votre message ?"
            }
            Self::RateLimited => {
                "Beaucoup de personnes me sollicitent en ce moment. Laissez passer un instant, puis réessayez."
            }
            Self::NetworkFailure => "La connexion énergétique est faible. Réessayez dans un instant.",
            Self::Unknown => {
                "Le lien énergétique est un peu perturbé en ce moment. Je vous prie de m'excuser. Pourriez-vous reformuler votre message ou contacter Jean-François au 09.55.55.44.62 ?"
            }
        }
    }

    /// Operator-facing remediation, only for kinds a visitor cannot fix.
    pub const fn remediation(self) -> Option<&'static str> {
        match self {
            Self::MissingCredential => Some(
                "Configuration: no API key found. Set ASSISTANT_API_KEY (or GEMINI_API_KEY, GOOGLE_API_KEY, API_KEY).",
            ),
            Self::AuthRejected => Some(
                "Configuration: the generative service rejected the API key. Check that it is valid and enabled for this project.",
            ),
            Self::EmptyResponse | Self::RateLimited | Self::NetworkFailure | Self::Unknown => None,
        }
    }
}

/// Every cause a send can fail with.
#[derive(Debug, Error)]
pub enum AssistantFailure {
    #[error("no credential configured")]
    MissingCredential,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

pub fn classify(failure: &AssistantFailure) -> ErrorKind {
    match failure {
        AssistantFailure::MissingCredential => ErrorKind::MissingCredential,
        AssistantFailure::Parse(ParseError::EmptyResponse { .. }) => ErrorKind::EmptyResponse,
        AssistantFailure::Client(ClientError::Timeout | ClientError::Transport(_)) => {
            ErrorKind::NetworkFailure
        }
        AssistantFailure::Client(ClientError::Status { status, reason }) => {
            classify_status(*status, reason.as_deref())
        }
        AssistantFailure::Client(ClientError::InvalidPayload(_))
        | AssistantFailure::Unexpected(_) => ErrorKind::Unknown,
    }
}

fn classify_status(status: u16, reason: Option<&str>) -> ErrorKind {
    let reason = reason.unwrap_or_default().trim().to_ascii_uppercase();

    match status {
        401 | 403 => ErrorKind::AuthRejected,
        429 => ErrorKind::RateLimited,
        _ if matches!(reason.as_str(), "RESOURCE_EXHAUSTED" | "RATE_LIMIT_EXCEEDED") => {
            ErrorKind::RateLimited
        }
        400 if is_credential_reason(&reason) => ErrorKind::AuthRejected,
        502..=504 => ErrorKind::NetworkFailure,
        _ => ErrorKind::Unknown,
    }
}

fn is_credential_reason(reason: &str) -> bool {
    reason.contains("API_KEY") || matches!(reason, "UNAUTHENTICATED" | "PERMISSION_DENIED")
}
