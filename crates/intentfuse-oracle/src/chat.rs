//! OpenAI-compatible chat-completions client implementing [`Oracle`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use intentfuse_core::{AmbiguitySet, Label, Oracle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::prompt::{ChatMessage, adjudication_messages, classification_messages};

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("completion contained no answer")]
    EmptyResponse,
}

#[derive(Clone)]
pub struct OracleConfig {
    /// Like `https://api.openai.com`; the `/v1/chat/completions` path is appended.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key,
        })
    }

    /// Send one chat completion and return the first choice's trimmed text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, OracleError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        info!(url = %url, model = %self.model, "requesting oracle completion");
        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let raw = resp.text().await?;
        let answer = parse_completion(&raw)?;
        debug!(answer = %answer, "oracle answered");
        Ok(answer)
    }
}

fn parse_completion(raw: &str) -> Result<String, OracleError> {
    let parsed: CompletionResponse = serde_json::from_str(raw)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(OracleError::EmptyResponse)
}

#[async_trait]
impl Oracle for ChatOracle {
    async fn classify(&self, text: &str) -> anyhow::Result<String> {
        Ok(self.complete(&classification_messages(text)).await?)
    }

    async fn adjudicate(
        &self,
        text: &str,
        single_label: &Label,
        ambiguity: &AmbiguitySet,
    ) -> anyhow::Result<String> {
        Ok(self
            .complete(&adjudication_messages(text, single_label, ambiguity))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(base_url: &str) -> OracleConfig {
        OracleConfig {
            base_url: base_url.into(),
            model: "gpt-4o-mini".into(),
            api_key: Some("sk-secret".into()),
            timeout: Duration::from_secs(5),
        }
    }

    /// Serve a single canned HTTP response and hand back the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn trims_trailing_slash() {
        let oracle = ChatOracle::new(config("http://localhost:8080/")).unwrap();
        assert_eq!(oracle.base_url, "http://localhost:8080");
    }

    #[test]
    fn debug_redacts_api_key() {
        let dbg = format!("{:?}", config("http://localhost"));
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn parse_first_choice_trimmed() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Factual\n"}},
                      {"message":{"role":"assistant","content":"Multi-Part"}}]}"#;
        assert_eq!(parse_completion(raw).unwrap(), "Factual");
    }

    #[test]
    fn parse_empty_choices() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(OracleError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(OracleError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion("not json"),
            Err(OracleError::Json(_))
        ));
    }

    #[test]
    fn request_body_shape() {
        let messages = classification_messages("hi");
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["temperature"], 0.0);
    }

    #[tokio::test]
    async fn classify_posts_chat_completion() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"Reasoning/Inference"}}]}"#,
        )
        .await;
        let oracle = ChatOracle::new(config(&url)).unwrap();

        let answer = oracle.classify("Why did churn rise?").await.unwrap();
        assert_eq!(answer, "Reasoning/Inference");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-secret"));
        assert!(request.contains("Why did churn rise?"));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"error":"overloaded"}"#).await;
        let oracle = ChatOracle::new(config(&url)).unwrap();

        let err = oracle
            .complete(&classification_messages("hi"))
            .await
            .unwrap_err();
        match err {
            OracleError::Server { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("overloaded"));
            }
            other => panic!("expected Server error, got {other:?}"),
        }
        server.await.unwrap();
    }
}
