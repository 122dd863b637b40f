//! OpenAI-compatible chat completions oracle.
//!
//! Sends the rendered prompt plus the expected JSON schema to
//! `<endpoint>/chat/completions` with `response_format = json_object` and
//! returns the first JSON object found in the reply.

use async_trait::async_trait;
use evidence_application::ports::oracle::{OracleError, OracleRequest, ReasoningOracle};
use evidence_domain::extract_json_object;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Oracle backed by a remote chat model
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpOracle {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    fn body(&self, request: &OracleRequest) -> Value {
        let system = format!(
            "{}\n\nRespond with a single JSON object matching this schema:\n{}",
            request.system,
            request.schema.json_schema()
        );
        json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": request.user},
            ],
        })
    }
}

#[async_trait]
impl ReasoningOracle for HttpOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let mut builder = self.client.post(&url).json(&self.body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        let value = interpret(status, &body).map_err(|e| match e {
            OracleError::Unavailable(reason) => {
                OracleError::Unavailable(format!("{} from {}", reason, url))
            }
            other => other,
        })?;
        debug!("{} reply: {} bytes", request.schema, body.len());
        Ok(value)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Map a chat completions response to the JSON object the model produced.
fn interpret(status: StatusCode, body: &str) -> Result<Value, OracleError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(OracleError::RateLimited);
    }
    if !status.is_success() {
        return Err(OracleError::Unavailable(format!("HTTP {}", status.as_u16())));
    }

    let chat: ChatResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::SchemaViolation(format!("malformed completion: {}", e)))?;
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| OracleError::SchemaViolation("empty completion".to_string()))?;

    extract_json_object(&content).ok_or_else(|| {
        OracleError::SchemaViolation("completion contains no JSON object".to_string())
    })
}

fn map_transport_error(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout
    } else if e.is_decode() {
        OracleError::SchemaViolation(e.to_string())
    } else {
        OracleError::Unavailable(e.to_string())
    }
}
