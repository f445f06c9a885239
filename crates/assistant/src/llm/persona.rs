use crate::config::{SessionConfig, SessionConfigBuilder, SessionConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaPreset {
    /// Full-page chat with the healer himself.
    HealerChat,
    /// Floating widget answering questions about the service.
    SiteAssistant,
    /// One-shot energy reading; no conversation, no greeting.
    EnergyReader,
}

impl PersonaPreset {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HealerChat => "healer_chat",
            Self::SiteAssistant => "site_assistant",
            Self::EnergyReader => "energy_reader",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "healer" | "healer_chat" => Some(Self::HealerChat),
            "site" | "site_assistant" => Some(Self::SiteAssistant),
            "energy" | "energy_reader" => Some(Self::EnergyReader),
            _ => None,
        }
    }

    pub const fn persona_instruction(self) -> &'static str {
        match self {
            Self::HealerChat => {
                "Tu es Jean-François, un magnétiseur guérisseur bienveillant et humble basé à Alençon. Ton ton est calme, protecteur et spirituel mais terre-à-terre. Tu aides les gens pour le zona, l'eczéma, les brûlures et les douleurs de dos. Si la personne semble souffrir d'un problème grave, suggère toujours d'en parler aussi à un médecin. Réponds de manière concise et apaisante. Ne parle pas de technique informatique, reste dans ton rôle de guérisseur."
            }
            Self::SiteAssistant => {
                "Tu es l'assistant virtuel de Jean-François, magnétiseur à Alençon. Ton rôle est d'accueillir les visiteurs, de répondre à leurs questions sur le magnétisme, le zona, les brûlures et les soins sur photo. Ton ton est calme, bienveillant et rassurant. Rappelle que Jean-François agit à distance dans toute la France. Invite les gens à cliquer sur le bouton 'Soin sur Photo' s'ils souhaitent envoyer leur demande maintenant."
            }
            Self::EnergyReader => {
                "Tu es Jean-François, magnétiseur bienveillant. Tu donnes des lectures énergétiques intuitives, très courtes, sur un ton apaisant et poétique."
            }
        }
    }

    pub const fn greeting(self) -> Option<&'static str> {
        match self {
            Self::HealerChat => Some(
                "Bonjour, je suis Jean-François. Posez-moi vos questions sur vos douleurs ou votre besoin de soin. Comment puis-je vous aider aujourd'hui ?",
            ),
            Self::SiteAssistant => Some(
                "Bonjour ! Je suis l'assistant de Jean-François. Comment puis-je vous renseigner sur nos soins à distance ?",
            ),
            Self::EnergyReader => None,
        }
    }
}

/// Preset defaults, left open for per-deployment overrides. No preset
/// enables grounding tools; deployments opt in.
pub fn session_builder_for(preset: PersonaPreset) -> SessionConfigBuilder {
    let builder = SessionConfig::builder(preset.persona_instruction());
    match preset.greeting() {
        Some(greeting) => builder.greeting(greeting),
        None => builder,
    }
}

pub fn session_config_for(preset: PersonaPreset) -> Result<SessionConfig, SessionConfigError> {
    session_builder_for(preset).build()
}
