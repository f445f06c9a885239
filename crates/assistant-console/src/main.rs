mod cli;
mod render;

use std::sync::Arc;

use assistant::config::{ToolsEnabled, fixed_location_from_env, load_dotenv};
use assistant::grounding::FixedLocation;
use assistant::llm::{GeminiClient, GeminiClientConfig, GenerativeClient, session_builder_for};
use assistant::reading::{READING_UNAVAILABLE_MESSAGE, request_reading};
use assistant::{
    AssistantSession, CredentialResolver, GroundingContextProvider, IgnoredReason, Role,
    SendOutcome,
};
use cli::{CliError, CliOptions, ConsoleMode};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "assistant=info,assistant_console=info".to_string()),
        )
        .json()
        .flatten_event(true)
        .with_writer(std::io::stderr)
        .init();

    let client_config = match GeminiClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load client config: {err}");
            std::process::exit(1);
        }
    };
    let model = client_config.model.clone();
    let client: Arc<dyn GenerativeClient> = match GeminiClient::new(client_config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!("failed to build generative client: {err}");
            std::process::exit(1);
        }
    };

    let env_tools = match ToolsEnabled::from_env() {
        Ok(tools) => tools,
        Err(err) => {
            error!("failed to load tool settings: {err}");
            std::process::exit(1);
        }
    };
    let location = match options.location {
        Some(hint) => Some(hint),
        None => match fixed_location_from_env() {
            Ok(hint) => hint,
            Err(err) => {
                error!("failed to load location settings: {err}");
                std::process::exit(1);
            }
        },
    };

    let tools = ToolsEnabled {
        search: env_tools.search || options.search,
        maps: env_tools.maps || options.maps,
    };
    let session_config = match session_builder_for(options.persona)
        .tools(tools)
        .sampling_temperature(options.temperature)
        .reset_policy(options.reset_policy)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            error!("invalid session config: {err}");
            std::process::exit(2);
        }
    };

    info!(
        persona = options.persona.as_str(),
        model = %model,
        search = tools.search,
        maps = tools.maps,
        pinned_location = location.is_some(),
        "assistant console starting"
    );

    match options.mode {
        ConsoleMode::Reading(scores) => {
            match request_reading(
                client.as_ref(),
                &CredentialResolver::default(),
                &session_config,
                scores,
            )
            .await
            {
                Ok(reading) => println!("{}", render::render_reading(&reading)),
                Err(kind) => {
                    println!("{READING_UNAVAILABLE_MESSAGE}");
                    if let Some(remediation) = kind.remediation() {
                        eprintln!("! {}: {remediation}", kind.as_str());
                    }
                    std::process::exit(1);
                }
            }
        }
        ConsoleMode::Chat => {
            let mut session = AssistantSession::new(session_config, client);
            if let Some(hint) = location {
                session = session
                    .with_grounding(GroundingContextProvider::new(Arc::new(FixedLocation(hint))));
            }
            if let Err(err) = run_chat(&session).await {
                error!(session_id = %session.id(), "console input failed: {err}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_chat(session: &AssistantSession) -> std::io::Result<()> {
    for turn in session.turns() {
        println!("{}", render::render_turn(&turn));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                match session.reset() {
                    Ok(()) => {
                        for turn in session.turns() {
                            println!("{}", render::render_turn(&turn));
                        }
                    }
                    Err(err) => warn!(session_id = %session.id(), "reset rejected: {err}"),
                }
                continue;
            }
            _ => {}
        }

        let seen = session.turns().len();
        let outcome = tokio::select! {
            outcome = session.send(&line) => outcome,
            _ = tokio::signal::ctrl_c() => {
                session.close();
                break;
            }
        };

        match outcome {
            SendOutcome::Replied | SendOutcome::Failed(_) => {
                for turn in session
                    .turns()
                    .iter()
                    .skip(seen)
                    .filter(|turn| turn.role == Role::Assistant)
                {
                    println!("{}", render::render_turn(turn));
                }
            }
            SendOutcome::Ignored(IgnoredReason::Blank) => {}
            SendOutcome::Ignored(reason) => {
                warn!(session_id = %session.id(), ?reason, "message ignored");
            }
            SendOutcome::Discarded => break,
        }
    }

    let interaction = session.interaction();
    session.close();
    info!(
        session_id = %session.id(),
        sends = interaction.sends,
        replies = interaction.replies,
        failures = interaction.failures,
        "assistant console closed"
    );
    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage: cargo run -p assistant-console -- [--persona healer|site|energy] [options]\n\
         \n\
         Chat mode (default) reads one message per line from stdin.\n\
         Commands: /reset starts over, /quit leaves.\n\
         \n\
         Options:\n\
         - --persona NAME          healer (default), site or energy\n\
         - --search                Enable web search grounding\n\
         - --maps                  Enable maps grounding\n\
         - --temperature VALUE     Sampling temperature, 0.0 to 2.0\n\
         - --lat VALUE --lng VALUE Pin the caller location for grounding\n\
         - --reset-empty           /reset leaves an empty conversation\n\
         - --reading P,E,M         One energy reading from three scores (0-100)\n\
         - --help                  Show this help text\n\
         \n\
         The API key is read from ASSISTANT_API_KEY, GEMINI_API_KEY, GOOGLE_API_KEY or API_KEY."
    );
}
