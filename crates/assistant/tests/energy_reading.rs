use std::collections::VecDeque;
use std::sync::Arc;

use assistant::conversation::Role;
use assistant::credentials::{Credential, CredentialResolver, CredentialSlot};
use assistant::llm::{
    ClientError, ErrorKind, GenerateFuture, GenerateRequest, GenerativeClient, PersonaPreset,
    RawResult, session_config_for,
};
use assistant::reading::{EMPTY_READING_FALLBACK, EnergyScores, request_reading};
use tokio::sync::Mutex;

struct StubClient {
    responses: Mutex<VecDeque<Result<RawResult, ClientError>>>,
    seen_requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl StubClient {
    fn with_responses(responses: Vec<Result<RawResult, ClientError>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            seen_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl GenerativeClient for StubClient {
    fn generate<'a>(
        &'a self,
        _credential: &'a Credential,
        request: &'a GenerateRequest,
    ) -> GenerateFuture<'a> {
        Box::pin(async move {
            self.seen_requests.lock().await.push(request.clone());
            self.responses.lock().await.pop_front().unwrap_or_else(|| {
                Err(ClientError::Transport("missing_stub_response".to_string()))
            })
        })
    }
}

fn credentials() -> CredentialResolver {
    CredentialResolver::new(vec![CredentialSlot::BuildTime {
        name: "TEST_READING_KEY",
        value: Some("reading-key"),
    }])
}

#[tokio::test]
async fn reading_sends_scores_as_a_single_turn() {
    let client = StubClient::with_responses(vec![Ok(RawResult::from_text(
        "  Votre énergie se stabilise doucement.  ",
        Vec::new(),
    ))]);
    let config = session_config_for(PersonaPreset::EnergyReader).expect("valid preset");

    let reading = request_reading(&client, &credentials(), &config, EnergyScores::new(20, 40, 60))
        .await
        .expect("reading should succeed");

    assert_eq!(reading.frequency, 40);
    assert_eq!(reading.label, "Fréquence Neutre - Équilibre à consolider");
    assert_eq!(reading.text, "Votre énergie se stabilise doucement.");
    assert!(!reading.fallback);

    let requests = client.seen_requests.lock().await.clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].turns.len(), 1);
    assert_eq!(requests[0].turns[0].role, Role::User);
    assert!(requests[0].turns[0].content.contains("Physique: 20"));
    assert!(requests[0].tools.is_empty());
    assert!(requests[0].retrieval_bias.is_none());
}

#[tokio::test]
async fn empty_reading_falls_back_to_stock_text() {
    let client = StubClient::with_responses(vec![Ok(RawResult::default())]);
    let config = session_config_for(PersonaPreset::EnergyReader).expect("valid preset");

    let reading = request_reading(&client, &credentials(), &config, EnergyScores::default())
        .await
        .expect("empty reply should fall back");

    assert_eq!(reading.text, EMPTY_READING_FALLBACK);
    assert!(reading.fallback);
    assert_eq!(reading.frequency, 50);
}

#[tokio::test]
async fn reading_failures_are_classified() {
    let client = StubClient::with_responses(vec![Err(ClientError::Status {
        status: 429,
        reason: None,
    })]);
    let config = session_config_for(PersonaPreset::EnergyReader).expect("valid preset");

    let err = request_reading(&client, &credentials(), &config, EnergyScores::default())
        .await
        .expect_err("throttled reading should fail");
    assert_eq!(err, ErrorKind::RateLimited);
}

#[tokio::test]
async fn reading_without_credential_makes_no_call() {
    let client = StubClient::with_responses(Vec::new());
    let config = session_config_for(PersonaPreset::EnergyReader).expect("valid preset");
    let empty = CredentialResolver::new(vec![CredentialSlot::BuildTime {
        name: "TEST_READING_KEY",
        value: None,
    }]);

    let err = request_reading(&client, &empty, &config, EnergyScores::default())
        .await
        .expect_err("missing credential should fail");

    assert_eq!(err, ErrorKind::MissingCredential);
    assert!(client.seen_requests.lock().await.is_empty());
}
