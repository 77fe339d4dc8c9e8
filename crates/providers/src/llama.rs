use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::agent_api::ChatMessage;
use std::sync::LazyLock;
use std::time::Duration;

/// How long a single chat request may take before it is abandoned.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// Callers drive requests from short-lived runtimes, one per send, so pooled
// connections must not outlive the runtime that opened them.
static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(0)
        .build()
        .expect("failed to build HTTP client")
});

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: i64,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Errors ───────────────────────────────────────────────────────────

/// Ways a chat request can fail. Each maps to one user-visible chat entry.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("model server answered with HTTP {}", .0.as_u16())]
    Status(StatusCode),

    #[error("model server at {url} is unreachable")]
    Unreachable { url: String, port: Option<u16> },

    #[error("request timed out after {} seconds", seconds(*.0))]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Transport(String),
}

impl ChatError {
    /// Text shown in the chat panel for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Status(status) => format!("API error: {}", status.as_u16()),
            ChatError::Unreachable { url, port } => match port {
                Some(port) => format!(
                    "Cannot connect to the model server at {} (port {}). Is it running?",
                    url, port
                ),
                None => format!("Cannot connect to the model server at {}. Is it running?", url),
            },
            ChatError::Timeout(after) => {
                format!("Request timed out after {} seconds.", seconds(*after))
            }
            ChatError::Malformed(detail) => format!("Error: unexpected response: {}", detail),
            ChatError::Transport(detail) => format!("Error: {}", detail),
        }
    }

    /// Whether the failure came from the model server (as opposed to us).
    pub fn is_upstream(&self) -> bool {
        !matches!(self, ChatError::Transport(_))
    }
}

/// Whole seconds when exact, otherwise fractional ("0.3").
fn seconds(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        d.as_secs_f64().to_string()
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Client for a llama.cpp-style `/v1/chat/completions` endpoint.
pub struct LlamaClient {
    http: Client,
    /// The URL as configured, used in error messages.
    configured_url: String,
    base_url: String,
    timeout: Duration,
}

impl LlamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            configured_url: base_url.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// A client with its own timeout instead of the shared 120 s one.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            configured_url: base_url.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// One best-effort completion. No retries.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: i64,
    ) -> Result<String, ChatError> {
        let req = CompletionRequest {
            messages,
            temperature,
            max_tokens,
        };
        let resp = self
            .http
            .post(self.endpoint())
            .json(&req)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::debug!(status = status.as_u16(), "model server returned an error status");
            return Err(ChatError::Status(status));
        }

        let body = resp.text().await.map_err(|e| self.classify(e))?;
        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::Malformed(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Malformed("response contained no choices".into()))?;
        Ok(choice.message.content.unwrap_or_default())
    }

    fn classify(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout(self.timeout)
        } else if err.is_connect() {
            let port = url::Url::parse(&self.base_url)
                .ok()
                .and_then(|u| u.port_or_known_default());
            ChatError::Unreachable {
                url: self.configured_url.clone(),
                port,
            }
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    /// Answer exactly one request with `status`/`body` and hand back the
    /// JSON the client sent.
    fn serve_once(status: u16, body: &'static str) -> (String, thread::JoinHandle<serde_json::Value>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut sent = String::new();
            request.as_reader().read_to_string(&mut sent).unwrap();
            let response = tiny_http::Response::from_string(body).with_status_code(status);
            request.respond(response).unwrap();
            serde_json::from_str(&sent).unwrap()
        });
        (format!("http://{}/", addr), handle)
    }

    fn sample_messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("persona"), ChatMessage::user("hi")]
    }

    #[tokio::test]
    async fn test_success_extracts_first_choice() {
        let (url, server) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"hello there"}}]}"#,
        );
        let client = LlamaClient::new(&url);
        let reply = client.complete(&sample_messages(), 0.7, 2000).await.unwrap();
        assert_eq!(reply, "hello there");

        let sent = server.join().unwrap();
        assert_eq!(sent["temperature"], 0.7);
        assert_eq!(sent["max_tokens"], 2000);
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn test_error_status_names_code() {
        let (url, server) = serve_once(500, "boom");
        let err = LlamaClient::new(&url)
            .complete(&sample_messages(), 0.7, 10)
            .await
            .unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, ChatError::Status(s) if s.as_u16() == 500));
        assert_eq!(err.user_message(), "API error: 500");
    }

    #[tokio::test]
    async fn test_connection_refused_names_url() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}", port);
        let err = LlamaClient::new(&url)
            .complete(&sample_messages(), 0.7, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Unreachable { .. }));
        let text = err.user_message();
        assert!(text.contains(&url));
        assert!(text.contains(&port.to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_keeps_configured_url() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/", port);
        let err = LlamaClient::new(&url)
            .complete(&sample_messages(), 0.7, -1)
            .await
            .unwrap_err();
        match err {
            ChatError::Unreachable { url: reported, port: reported_port } => {
                assert_eq!(reported, url);
                assert_eq!(reported_port, Some(port));
            }
            other => panic!("expected Unreachable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Bound but never accepted: the connect succeeds, no reply ever comes.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = LlamaClient::with_timeout(&url, Duration::from_millis(300)).unwrap();
        let err = client.complete(&sample_messages(), 0.7, 10).await.unwrap_err();
        drop(listener);
        assert!(matches!(err, ChatError::Timeout(d) if d == Duration::from_millis(300)));
        assert_eq!(err.user_message(), "Request timed out after 0.3 seconds.");
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let (url, server) = serve_once(200, r#"{"choices":[]}"#);
        let err = LlamaClient::new(&url)
            .complete(&sample_messages(), 0.7, 10)
            .await
            .unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, ChatError::Malformed(_)));
        assert!(err.user_message().starts_with("Error:"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = LlamaClient::new("http://localhost:8080/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(
            ChatError::Timeout(REQUEST_TIMEOUT).user_message(),
            "Request timed out after 120 seconds."
        );
        assert_eq!(
            ChatError::Timeout(Duration::from_millis(1500)).to_string(),
            "request timed out after 1.5 seconds"
        );
    }
}
