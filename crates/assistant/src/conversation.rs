use serde::{Deserialize, Serialize};

use crate::llm::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

/// Set on assistant turns produced by the error classifier instead of the
/// remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFailure {
    pub kind: ErrorKind,
    /// Operator-facing note, rendered apart from the persona-voiced text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TurnFailure>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            citations: Vec::new(),
            failure: None,
        }
    }

    pub fn assistant(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            citations,
            failure: None,
        }
    }

    pub fn assistant_error(kind: ErrorKind) -> Self {
        Self {
            role: Role::Assistant,
            text: kind.user_message().to_string(),
            citations: Vec::new(),
            failure: Some(TurnFailure {
                kind,
                remediation: kind.remediation().map(ToString::to_string),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.failure.is_some()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.failure.as_ref().map(|failure| failure.kind)
    }
}

/// Role/text projection of a turn, the shape replayed to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

/// Append-only turn log. The only destructive operation is a whole reset.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
    greeting: Option<String>,
    seeded: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the log with a display-only assistant greeting.
    pub fn seeded(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            turns: vec![Turn::assistant(greeting.clone(), Vec::new())],
            greeting: Some(greeting),
            seeded: true,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Outgoing history: greeting and error turns dropped, citations stripped.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let skip = usize::from(self.seeded);
        self.turns
            .iter()
            .skip(skip)
            .filter(|turn| !turn.is_error())
            .map(|turn| HistoryEntry {
                role: turn.role,
                text: turn.text.clone(),
            })
            .collect()
    }

    /// Clears the log. With `reseed` the greeting (if any) is put back.
    pub fn reset(&mut self, reseed: bool) {
        self.turns.clear();
        self.seeded = false;

        if reseed && let Some(greeting) = self.greeting.clone() {
            self.turns.push(Turn::assistant(greeting, Vec::new()));
            self.seeded = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Citation, ConversationStore, Role, Turn};
    use crate::llm::ErrorKind;

    #[test]
    fn history_skips_seeded_greeting_and_error_turns() {
        let mut store = ConversationStore::seeded("Bonjour");
        store.append(Turn::user("J'ai mal au dos"));
        store.append(Turn::assistant_error(ErrorKind::NetworkFailure));
        store.append(Turn::user("Vous êtes là ?"));
        store.append(Turn::assistant(
            "Oui, je vous écoute.",
            vec![Citation {
                title: "source".to_string(),
                uri: "https://example.org".to_string(),
            }],
        ));

        let history = store.history();
        let texts = history
            .iter()
            .map(|entry| entry.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            texts,
            vec!["J'ai mal au dos", "Vous êtes là ?", "Oui, je vous écoute."]
        );
        assert_eq!(history[2].role, Role::Assistant);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn unseeded_store_keeps_leading_assistant_turn_in_history() {
        let mut store = ConversationStore::new();
        store.append(Turn::assistant("first", Vec::new()));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn reset_clears_or_reseeds_greeting() {
        let mut store = ConversationStore::seeded("Bonjour");
        store.append(Turn::user("salut"));

        store.reset(true);
        assert_eq!(store.len(), 1);
        assert_eq!(store.turns()[0].text, "Bonjour");
        assert!(store.history().is_empty());

        store.reset(false);
        assert!(store.is_empty());
        store.append(Turn::user("encore"));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn error_turn_carries_kind_and_remediation() {
        let turn = Turn::assistant_error(ErrorKind::MissingCredential);
        assert!(turn.is_error());
        assert_eq!(turn.error_kind(), Some(ErrorKind::MissingCredential));
        assert!(
            turn.failure
                .as_ref()
                .and_then(|failure| failure.remediation.as_ref())
                .is_some()
        );

        let turn = Turn::assistant_error(ErrorKind::RateLimited);
        assert!(
            turn.failure
                .as_ref()
                .is_some_and(|failure| failure.remediation.is_none())
        );
    }
}
