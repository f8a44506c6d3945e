use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::gateway::{GatewayError, Prompt, PromptSubject, PromptTransport};

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Sends rendered prompts to a `generateContent` endpoint in JSON mode, with a
/// response schema matching the reply the gateway parses.
pub(crate) struct HttpTransport {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    pub(crate) fn new(
        endpoint: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;
        Ok(Self::with_client(client, endpoint, model, api_key))
    }

    fn with_client(client: Client, endpoint: &str, model: &str, api_key: String) -> Self {
        Self {
            client,
            url: generate_content_url(endpoint, model),
            api_key,
        }
    }
}

impl PromptTransport for HttpTransport {
    fn complete(&self, prompt: &Prompt<'_>) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body(prompt))
            .send()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = body.chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
            return Err(GatewayError::Transport(format!("HTTP {status}: {detail}")));
        }

        let reply = response
            .json::<GenerateContentResponse>()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;
        reply_text(reply)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn generate_content_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model.trim()
    )
}

fn request_body(prompt: &Prompt<'_>) -> Value {
    let schema = match prompt.subject {
        PromptSubject::Agent(_) => agent_reaction_schema(),
        PromptSubject::Environment(_) => environment_change_schema(),
    };
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt.text }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        },
    })
}

fn agent_reaction_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "emotionalState": { "type": "STRING" },
            "currentThought": { "type": "STRING" },
            "reasoning": { "type": "STRING" },
            "destination": { "type": "STRING" },
            "memoryUpdate": { "type": "STRING" },
        },
        "required": ["emotionalState", "currentThought", "reasoning", "destination"],
    })
}

fn environment_change_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "weather": { "type": "STRING" },
            "buildingUpdates": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "buildingId": { "type": "INTEGER" },
                        "state": { "type": "STRING" },
                    },
                },
            },
            "eventLog": { "type": "STRING" },
        },
        "required": ["weather", "eventLog"],
    })
}

/// The JSON reply is the concatenated text of the first candidate.
fn reply_text(reply: GenerateContentResponse) -> Result<String, GatewayError> {
    let text = reply
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GatewayError::Transport(
            "service reply carried no candidate text".to_string(),
        ));
    }
    Ok(text)
}
