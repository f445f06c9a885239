pub mod config;
mod config_env;
pub mod conversation;
pub mod credentials;
pub mod grounding;
pub mod llm;
pub mod reading;
pub mod session;

pub use conversation::{Citation, ConversationStore, HistoryEntry, Role, Turn, TurnFailure};
pub use credentials::{Credential, CredentialResolver, CredentialSlot};
pub use grounding::{GroundingContextProvider, GroundingHint, LocationError, LocationSource};
pub use session::{AssistantSession, IgnoredReason, Interaction, SendOutcome, SessionError};
