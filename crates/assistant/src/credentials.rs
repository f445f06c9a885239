use std::env;
use std::fmt;

use tracing::debug;

/// API secret for one request. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("len", &self.0.len())
            .finish()
    }
}

/// One named place a credential may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSlot {
    /// Captured at compile time with `option_env!`.
    BuildTime {
        name: &'static str,
        value: Option<&'static str>,
    },
    /// Read from the process environment at resolve time.
    Env { name: String },
}

impl CredentialSlot {
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::BuildTime { name, .. } => name,
            Self::Env { name } => name,
        }
    }
}

/// Ordered probe over credential slots; the first non-blank value wins.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    slots: Vec<CredentialSlot>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(default_slots())
    }
}

impl CredentialResolver {
    pub fn new(slots: Vec<CredentialSlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[CredentialSlot] {
        &self.slots
    }

    pub fn resolve(&self) -> Option<Credential> {
        self.resolve_with(|key| env::var(key).ok())
    }

    pub fn resolve_with<F>(&self, lookup: F) -> Option<Credential>
    where
        F: Fn(&str) -> Option<String>,
    {
        for slot in &self.slots {
            let candidate = match slot {
                CredentialSlot::BuildTime { value, .. } => value.map(ToString::to_string),
                CredentialSlot::Env { name } => lookup(name),
            };

            if let Some(secret) = candidate.as_deref().and_then(non_blank) {
                debug!(slot = slot.name(), "resolved assistant credential");
                return Some(Credential::new(secret));
            }
        }

        debug!(slots = self.slots.len(), "no assistant credential configured");
        None
    }
}

fn default_slots() -> Vec<CredentialSlot> {
    vec![
        CredentialSlot::BuildTime {
            name: "ASSISTANT_API_KEY",
            value: option_env!("ASSISTANT_API_KEY"),
        },
        CredentialSlot::BuildTime {
            name: "GEMINI_API_KEY",
            value: option_env!("GEMINI_API_KEY"),
        },
        CredentialSlot::BuildTime {
            name: "API_KEY",
            value: option_env!("API_KEY"),
        },
        CredentialSlot::env("ASSISTANT_API_KEY"),
        CredentialSlot::env("GEMINI_API_KEY"),
        CredentialSlot::env("GOOGLE_API_KEY"),
        CredentialSlot::env("API_KEY"),
    ]
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
