use thiserror::Error;
use tracing::debug;

use super::client::{ChunkSource, GroundingChunk, RawResult};
use crate::conversation::Citation;

const MAP_TITLE_FALLBACK: &str = "map result";
const WEB_TITLE_FALLBACK: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("generative service returned no usable text")]
    EmptyResponse { block_reason: Option<String> },
}

pub fn parse_reply(raw: &RawResult) -> Result<ParsedReply, ParseError> {
    let block_reason = raw
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone());
    let Some(candidate) = raw.candidates.first() else {
        return Err(ParseError::EmptyResponse { block_reason });
    };

    let text = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter(|part| !part.thought)
        .filter_map(|part| part.text.as_deref())
        .collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::EmptyResponse { block_reason });
    }

    let chunks = candidate
        .grounding_metadata
        .iter()
        .flat_map(|metadata| metadata.grounding_chunks.iter());
    let mut citations = Vec::new();
    for chunk in chunks {
        match chunk {
            GroundingChunk::Maps(source) => {
                citations.push(citation_from(source, MAP_TITLE_FALLBACK));
            }
            GroundingChunk::Web(source) => {
                citations.push(citation_from(source, WEB_TITLE_FALLBACK));
            }
            GroundingChunk::Unrecognized => {
                debug!("skipping unrecognized grounding chunk");
            }
        }
    }

    Ok(ParsedReply {
        text: text.to_string(),
        citations,
    })
}

fn citation_from(source: &ChunkSource, fallback_title: &str) -> Citation {
    let title = source
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(fallback_title);

    Citation {
        title: title.to_string(),
        uri: source.uri.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ParseError, parse_reply};
    use crate::conversation::Citation;
    use crate::llm::client::{ChunkSource, GroundingChunk, RawResult};

    #[test]
    fn plain_text_reply_has_no_citations() {
        let reply = parse_reply(&RawResult::from_text("Respirez profondément.", Vec::new()))
            .expect("text reply should parse");
        assert_eq!(reply.text, "Respirez profondément.");
        assert!(reply.citations.is_empty());
    }

    #[test]
    fn map_chunk_becomes_citation() {
        let raw = RawResult::from_text(
            "Le cabinet est à Alençon.",
            vec![GroundingChunk::Maps(ChunkSource {
                title: Some("Cabinet".to_string()),
                uri: "https://maps.example/x".to_string(),
            })],
        );
        let reply = parse_reply(&raw).expect("grounded reply should parse");
        assert_eq!(
            reply.citations,
            vec![Citation {
                title: "Cabinet".to_string(),
                uri: "https://maps.example/x".to_string(),
            }]
        );
    }

    #[test]
    fn mixed_chunks_keep_order_duplicates_and_fallback_titles() {
        let raw: RawResult = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [ { "text": "Voici " }, { "text": "mes sources." } ] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example" } },
                        { "unknown": { "uri": "https://ignored.example" } },
                        { "maps": { "uri": "https://maps.example/1", "title": "  " } },
                        { "web": { "uri": "https://a.example" } }
                    ]
                }
            }]
        }))
        .expect("fixture should deserialize");

        let reply = parse_reply(&raw).expect("reply should parse");
        assert_eq!(reply.text, "Voici mes sources.");
        let pairs = reply
            .citations
            .iter()
            .map(|citation| (citation.title.as_str(), citation.uri.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            pairs,
            vec![
                ("source", "https://a.example"),
                ("map result", "https://maps.example/1"),
                ("source", "https://a.example"),
            ]
        );
    }

    #[test]
    fn missing_or_blank_text_is_an_empty_response() {
        assert_eq!(
            parse_reply(&RawResult::default()),
            Err(ParseError::EmptyResponse { block_reason: None })
        );
        assert!(parse_reply(&RawResult::from_text("   ", Vec::new())).is_err());

        let blocked: RawResult = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .expect("fixture should deserialize");
        assert_eq!(
            parse_reply(&blocked),
            Err(ParseError::EmptyResponse {
                block_reason: Some("SAFETY".to_string())
            })
        );
    }

    #[test]
    fn thought_parts_are_not_part_of_the_reply() {
        let raw: RawResult = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "internal reasoning", "thought": true },
                    { "text": "Bonne journée." }
                ] }
            }]
        }))
        .expect("fixture should deserialize");
        assert_eq!(
            parse_reply(&raw).map(|reply| reply.text),
            Ok("Bonne journée.".to_string())
        );
    }
}
