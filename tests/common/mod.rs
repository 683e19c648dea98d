#![allow(dead_code)]

use std::sync::{ Arc, Mutex };
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{ header, HeaderMap, StatusCode };
use axum::routing::post;
use axum::Router;
use chat_gateway::clock::Clock;
use chat_gateway::llm::chat::{ ChatClient, ChatError, CompletionRequest };
use chrono::{ DateTime, Utc };
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(rfc3339: &str) -> Arc<Self> {
        let now = DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc);
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

type Responder = dyn Fn(&CompletionRequest) -> Result<String, ChatError> + Send + Sync;

/// In-process stand-in for the upstream API that records every request.
pub struct ScriptedChatClient {
    pub requests: Mutex<Vec<CompletionRequest>>,
    respond: Box<Responder>,
    delay: Duration,
}

impl ScriptedChatClient {
    pub fn replying(reply: &str) -> Arc<Self> {
        let reply = reply.to_string();
        Self::with(move |_| Ok(reply.clone()), Duration::ZERO)
    }

    pub fn failing_with_status(status: u16) -> Arc<Self> {
        Self::with(
            move |_| Err(ChatError::Upstream { status, message: "upstream exploded".into() }),
            Duration::ZERO
        )
    }

    /// Answers `re: <last message>` after `delay`.
    pub fn echoing(delay: Duration) -> Arc<Self> {
        Self::with(
            |req| {
                let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
                Ok(format!("re: {}", last))
            },
            delay
        )
    }

    pub fn with<F>(respond: F, delay: Duration) -> Arc<Self>
        where F: Fn(&CompletionRequest) -> Result<String, ChatError> + Send + Sync + 'static
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay,
        })
    }

    pub fn recorded(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)(request)
    }

    fn get_model(&self) -> String {
        "scripted-model".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockUpstream {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

pub async fn start_mock_upstream(
    status: u16,
    response_body: &str,
    delay: Duration
) -> MockUpstream {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&requests);
    let response_body = response_body.to_string();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, payload: Bytes| {
            let sink = Arc::clone(&sink);
            let response_body = response_body.clone();
            async move {
                sink.lock().unwrap().push(RecordedRequest {
                    authorization: headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned),
                    body: serde_json::from_slice(&payload).unwrap_or(Value::Null),
                });
                tokio::time::sleep(delay).await;
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    response_body,
                )
            }
        })
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            }).await
            .ok();
    });

    MockUpstream {
        base_url: format!("http://{}/v1", addr),
        requests,
        shutdown: Some(shutdown_tx),
    }
}

pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }).to_string()
}
