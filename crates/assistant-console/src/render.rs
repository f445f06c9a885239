use std::fmt::Write as _;

use assistant::reading::EnergyReading;
use assistant::{Role, Turn};

pub fn render_turn(turn: &Turn) -> String {
    let speaker = match turn.role {
        Role::User => "vous",
        Role::Assistant => "assistant",
    };

    let mut out = format!("{speaker}> {}", turn.text);
    for (index, citation) in turn.citations.iter().enumerate() {
        let _ = write!(out, "\n  [{}] {} <{}>", index + 1, citation.title, citation.uri);
    }
    if let Some(failure) = &turn.failure {
        let _ = write!(out, "\n  ! {}", failure.kind.as_str());
        if let Some(remediation) = &failure.remediation {
            let _ = write!(out, ": {remediation}");
        }
    }
    out
}

pub fn render_reading(reading: &EnergyReading) -> String {
    format!(
        "{}% | {}\n{}",
        reading.frequency, reading.label, reading.text
    )
}
