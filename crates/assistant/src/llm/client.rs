use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::prompt::GenerateRequest;
use crate::credentials::Credential;

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResult, ClientError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("generative service request timed out")]
    Timeout,
    #[error("generative service unreachable: {0}")]
    Transport(String),
    #[error("generative service rejected the request: status={status} reason={}", reason.as_deref().unwrap_or("unknown"))]
    Status { status: u16, reason: Option<String> },
    #[error("generative service returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// Stateless transport to the remote model. One call is one request: retry
/// policy lives with the caller.
pub trait GenerativeClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        credential: &'a Credential,
        request: &'a GenerateRequest,
    ) -> GenerateFuture<'a>;
}

/// Structured `generateContent` result, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl RawResult {
    pub fn from_text(text: impl Into<String>, grounding_chunks: Vec<GroundingChunk>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![Part {
                        text: Some(text.into()),
                        thought: false,
                    }],
                }),
                grounding_metadata: Some(GroundingMetadata { grounding_chunks }),
                finish_reason: Some("STOP".to_string()),
            }],
            prompt_feedback: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    #[serde(default)]
    pub title: Option<String>,
    pub uri: String,
}

/// One grounding record. Map-shaped chunks are recognized before web-shaped
/// ones; anything else is kept as `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireChunk")]
pub enum GroundingChunk {
    Maps(ChunkSource),
    Web(ChunkSource),
    Unrecognized,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireChunk {
    Maps { maps: ChunkSource },
    Web { web: ChunkSource },
    Other(Value),
}

impl From<WireChunk> for GroundingChunk {
    fn from(chunk: WireChunk) -> Self {
        match chunk {
            WireChunk::Maps { maps } => Self::Maps(maps),
            WireChunk::Web { web } => Self::Web(web),
            WireChunk::Other(_) => Self::Unrecognized,
        }
    }
}
