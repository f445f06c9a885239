pub mod classifier;
pub mod client;
pub mod gemini;
pub mod parser;
pub mod persona;
pub mod prompt;

pub use classifier::{AssistantFailure, ErrorKind, classify};
pub use client::{
    ChunkSource, ClientError, GenerateFuture, GenerativeClient, GroundingChunk, RawResult,
};
pub use gemini::{GeminiClient, GeminiClientBuildError, GeminiClientConfig};
pub use parser::{ParseError, ParsedReply, parse_reply};
pub use persona::{PersonaPreset, session_builder_for, session_config_for};
pub use prompt::{GenerateRequest, RequestTurn, RetrievalBias, ToolDeclaration, build_request};
