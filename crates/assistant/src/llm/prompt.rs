use serde::Serialize;

use crate::config::SessionConfig;
use crate::conversation::{HistoryEntry, Role};
use crate::grounding::GroundingHint;

/// Provider-neutral request for one model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub turns: Vec<RequestTurn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_bias: Option<RetrievalBias>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolDeclaration {
    Search,
    Maps,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrievalBias {
    pub lat: f64,
    pub lng: f64,
}

impl From<GroundingHint> for RetrievalBias {
    fn from(hint: GroundingHint) -> Self {
        Self {
            lat: hint.latitude,
            lng: hint.longitude,
        }
    }
}

/// Assembles the outgoing request. Pure: no I/O, same inputs give the same
/// request.
pub fn build_request(
    config: &SessionConfig,
    history: &[HistoryEntry],
    user_text: &str,
    hint: Option<GroundingHint>,
) -> GenerateRequest {
    let mut turns = history
        .iter()
        .map(|entry| RequestTurn {
            role: entry.role,
            content: entry.text.clone(),
        })
        .collect::<Vec<_>>();
    turns.push(RequestTurn {
        role: Role::User,
        content: user_text.trim().to_string(),
    });

    let mut tools = Vec::new();
    if config.tools.search {
        tools.push(ToolDeclaration::Search);
    }
    if config.tools.maps {
        tools.push(ToolDeclaration::Maps);
    }

    GenerateRequest {
        system_instruction: config.persona_instruction.clone(),
        turns,
        tools,
        temperature: config.sampling_temperature,
        retrieval_bias: hint.map(RetrievalBias::from),
    }
}
