//! One-shot energy reading: three self-assessed scores go in, a short
//! intuitive reading comes out. No conversation is kept.

use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::credentials::CredentialResolver;
use crate::llm::{
    AssistantFailure, ErrorKind, GenerativeClient, ParseError, build_request, classify,
    parse_reply,
};

pub const MAX_SCORE: u8 = 100;
pub const EMPTY_READING_FALLBACK: &str =
    "Le souffle de vie circule en vous. Prenez un instant pour respirer profondément.";
pub const READING_UNAVAILABLE_MESSAGE: &str =
    "Le canal énergétique est encombré. Fiez-vous à votre propre ressenti un instant.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyScores {
    physical: u8,
    emotional: u8,
    mental: u8,
}

impl Default for EnergyScores {
    fn default() -> Self {
        Self::new(50, 50, 50)
    }
}

impl EnergyScores {
    /// Scores above 100 are clamped.
    pub fn new(physical: u8, emotional: u8, mental: u8) -> Self {
        Self {
            physical: physical.min(MAX_SCORE),
            emotional: emotional.min(MAX_SCORE),
            mental: mental.min(MAX_SCORE),
        }
    }

    pub fn physical(&self) -> u8 {
        self.physical
    }

    pub fn emotional(&self) -> u8 {
        self.emotional
    }

    pub fn mental(&self) -> u8 {
        self.mental
    }

    /// Rounded mean of the three scores.
    pub fn global_frequency(&self) -> u8 {
        let sum = u16::from(self.physical) + u16::from(self.emotional) + u16::from(self.mental);
        // round half up: (2 * sum + 3) / 6
        u8::try_from((2 * sum + 3) / 6).unwrap_or(MAX_SCORE)
    }

    pub fn reading_prompt(&self) -> String {
        format!(
            "Analyse ces scores énergétiques (sur 100) : Physique: {}, Émotionnel: {}, Mental: {}. \
             Donne une lecture intuitive très courte (2-3 phrases) et un conseil spirituel pour \
             remonter ou stabiliser la vibration. Utilise un ton apaisant et poétique.",
            self.physical, self.emotional, self.mental
        )
    }
}

pub fn frequency_label(frequency: u8) -> &'static str {
    match frequency {
        0..30 => "Fréquence Basse - Besoin de régénération",
        30..60 => "Fréquence Neutre - Équilibre à consolider",
        60..85 => "Fréquence Harmonieuse - Flux fluide",
        _ => "Fréquence Élevée - Rayonnement optimal",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyReading {
    pub frequency: u8,
    pub label: &'static str,
    pub text: String,
    /// True when the service answered with no text and the stock reading
    /// was used instead.
    pub fallback: bool,
}

pub async fn request_reading(
    client: &dyn GenerativeClient,
    credentials: &CredentialResolver,
    config: &SessionConfig,
    scores: EnergyScores,
) -> Result<EnergyReading, ErrorKind> {
    let frequency = scores.global_frequency();
    let label = frequency_label(frequency);

    let outcome = async {
        let credential = credentials
            .resolve()
            .ok_or(AssistantFailure::MissingCredential)?;
        let request = build_request(config, &[], &scores.reading_prompt(), None);
        let raw = client.generate(&credential, &request).await?;
        Ok::<_, AssistantFailure>(parse_reply(&raw))
    }
    .await;

    match outcome {
        Ok(Ok(reply)) => {
            info!(frequency, "energy reading received");
            Ok(EnergyReading {
                frequency,
                label,
                text: reply.text,
                fallback: false,
            })
        }
        Ok(Err(ParseError::EmptyResponse { .. })) => Ok(EnergyReading {
            frequency,
            label,
            text: EMPTY_READING_FALLBACK.to_string(),
            fallback: true,
        }),
        Err(failure) => {
            let kind = classify(&failure);
            warn!(error_kind = kind.as_str(), error = %failure, "energy reading failed");
            Err(kind)
        }
    }
}
