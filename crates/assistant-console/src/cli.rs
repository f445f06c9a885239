use assistant::GroundingHint;
use assistant::config::ResetPolicy;
use assistant::llm::PersonaPreset;
use assistant::reading::EnergyScores;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleMode {
    Chat,
    Reading(EnergyScores),
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub mode: ConsoleMode,
    pub persona: PersonaPreset,
    pub search: bool,
    pub maps: bool,
    pub temperature: Option<f32>,
    pub location: Option<GroundingHint>,
    pub reset_policy: ResetPolicy,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("invalid --persona value: {0}")]
    InvalidPersona(String),
    #[error("invalid number for {flag}: {value}")]
    InvalidNumber { flag: String, value: String },
    #[error("--lat and --lng must be given together")]
    IncompleteLocation,
    #[error("location is out of range: {latitude}, {longitude}")]
    LocationOutOfRange { latitude: f64, longitude: f64 },
    #[error("invalid --reading value, expected PHYSICAL,EMOTIONAL,MENTAL: {0}")]
    InvalidScores(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut mode = ConsoleMode::Chat;
        let mut persona = PersonaPreset::HealerChat;
        let mut search = false;
        let mut maps = false;
        let mut temperature = None;
        let mut latitude = None;
        let mut longitude = None;
        let mut reset_policy = ResetPolicy::default();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--persona" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    persona = PersonaPreset::parse(&value)
                        .ok_or_else(|| CliError::InvalidPersona(value.clone()))?;
                }
                "--search" => search = true,
                "--maps" => maps = true,
                "--temperature" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    temperature = Some(parse_number::<f32>(&arg, &value)?);
                }
                "--lat" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    latitude = Some(parse_number::<f64>(&arg, &value)?);
                }
                "--lng" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    longitude = Some(parse_number::<f64>(&arg, &value)?);
                }
                "--reset-empty" => reset_policy = ResetPolicy::Empty,
                "--reading" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    mode = ConsoleMode::Reading(parse_scores(&value)?);
                    persona = PersonaPreset::EnergyReader;
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        let location = match (latitude, longitude) {
            (None, None) => None,
            (Some(latitude), Some(longitude)) => {
                let hint = GroundingHint {
                    latitude,
                    longitude,
                };
                if !hint.is_valid() {
                    return Err(CliError::LocationOutOfRange {
                        latitude,
                        longitude,
                    });
                }
                Some(hint)
            }
            _ => return Err(CliError::IncompleteLocation),
        };

        Ok(Self {
            mode,
            persona,
            search,
            maps,
            temperature,
            location,
            reset_policy,
        })
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, CliError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| CliError::InvalidNumber {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}

fn parse_scores(value: &str) -> Result<EnergyScores, CliError> {
    let scores = value
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CliError::InvalidScores(value.to_string()))?;

    match scores.as_slice() {
        [physical, emotional, mental] => Ok(EnergyScores::new(*physical, *emotional, *mental)),
        _ => Err(CliError::InvalidScores(value.to_string())),
    }
}
