//! Debug-Protocol Client (spec.md §4.2): a thin, synchronous-feeling
//! wrapper over the browser's debugging protocol, specialized to the
//! operations this system needs.

pub mod cdp;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

use crate::error::DebugError;
use cdp::{CdpMessage, CdpRequest, TabInfo};

/// A console message or uncaught exception delivered by
/// `subscribe_console` (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct ConsoleEvent {
    pub level: String,
    pub message: String,
    pub is_exception: bool,
}

/// The value `evaluate` resolves to: either a JSON tree or a structured
/// error distinguishing timeout, evaluated-code exception, and transport
/// failure (spec.md §4.2).
pub type EvaluateOutcome = Result<serde_json::Value, DebugError>;

/// Seam over the real CDP transport so the Session Adapter's tests can
/// substitute a [`MockDebugTransport`] without a real browser
/// (SPEC_FULL §4.2).
#[async_trait]
pub trait DebugTransport: Send + Sync {
    async fn list_tabs(&self, port: u16) -> Result<Vec<TabInfo>, DebugError>;
    async fn attach(&self, tab: &TabInfo) -> Result<DebugSessionHandle, DebugError>;
}

/// A live command channel to one tab. Attaching is idempotent: calling it
/// again for the same tab id returns a handle to the same underlying
/// connection state (the real implementation keys on
/// `webSocketDebuggerUrl`).
#[derive(Clone)]
pub struct DebugSessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    next_id: AtomicU64,
    pending: SyncMutex<HashMap<u64, oneshot::Sender<CdpMessage>>>,
    outbound: mpsc::UnboundedSender<Message>,
    console_tx: SyncMutex<Option<mpsc::UnboundedSender<ConsoleEvent>>>,
}

impl std::fmt::Debug for DebugSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSessionHandle").finish_non_exhaustive()
    }
}

impl DebugSessionHandle {
    /// Evaluates `expression` in the tab's top frame. Calls on the same
    /// session execute in submission order (spec.md §4.2 ordering
    /// guarantee): IDs are assigned monotonically and matched against
    /// responses one at a time.
    pub async fn evaluate(
        &self,
        expression: &str,
        await_promise: bool,
        timeout: Duration,
    ) -> EvaluateOutcome {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(id, tx);

        let request = CdpRequest::evaluate(id, expression, await_promise);
        let body = serde_json::to_string(&request)
            .map_err(|e| DebugError::Transport(e.to_string()))?;
        if self.inner.outbound.send(Message::Text(body)).is_err() {
            self.inner.pending.lock().remove(&id);
            return Err(DebugError::Transport("websocket sender closed".to_string()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(CdpMessage::Response { result: Some(value), error: None, .. })) => {
                parse_evaluate_result(value)
            }
            Ok(Ok(CdpMessage::Response { error: Some(err), .. })) => {
                Err(DebugError::Exception(err.message))
            }
            Ok(Ok(_)) => Err(DebugError::Transport("malformed response".to_string())),
            Ok(Err(_)) => Err(DebugError::Transport("session closed before response".to_string())),
            Err(_) => {
                self.inner.pending.lock().remove(&id);
                Err(DebugError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Registers a callback channel for console messages and uncaught
    /// exceptions, delivered until the session closes (spec.md §4.2).
    pub fn subscribe_console(&self) -> mpsc::UnboundedReceiver<ConsoleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.console_tx.lock() = Some(tx);
        rx
    }
}

fn parse_evaluate_result(value: serde_json::Value) -> EvaluateOutcome {
    let parsed: cdp::EvaluateResult = serde_json::from_value(value)
        .map_err(|e| DebugError::Transport(format!("unparseable evaluate result: {e}")))?;
    if let Some(details) = parsed.exception_details {
        return Err(DebugError::Exception(details.to_string()));
    }
    Ok(parsed.result.value.unwrap_or(serde_json::Value::Null))
}

/// Real WebSocket-backed transport: `list_tabs` is a plain `GET /json`;
/// `attach` upgrades to the tab's `webSocketDebuggerUrl` (SPEC_FULL
/// §4.2).
#[derive(Debug, Default)]
pub struct CdpDebugTransport {
    http: reqwest::Client,
}

#[async_trait]
impl DebugTransport for CdpDebugTransport {
    async fn list_tabs(&self, port: u16) -> Result<Vec<TabInfo>, DebugError> {
        let url = format!("http://127.0.0.1:{port}/json");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DebugError::Transport(e.to_string()))?;
        let tabs: Vec<TabInfo> = response
            .json()
            .await
            .map_err(|e| DebugError::Transport(e.to_string()))?;
        Ok(tabs)
    }

    async fn attach(&self, tab: &TabInfo) -> Result<DebugSessionHandle, DebugError> {
        let (ws, _response) = tokio_tungstenite::connect_async(&tab.web_socket_debugger_url)
            .await
            .map_err(|e| DebugError::Transport(e.to_string()))?;
        let (mut write, mut read) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let inner = Arc::new(SessionInner {
            next_id: AtomicU64::new(1),
            pending: SyncMutex::new(HashMap::new()),
            outbound: outbound_tx,
            console_tx: SyncMutex::new(None),
        });

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
        });

        let reader_inner = inner.clone();
        tokio::spawn(async move {
            while let Some(Ok(message)) = read.next().await {
                let Message::Text(text) = message else { continue };
                let Ok(parsed) = serde_json::from_str::<CdpMessage>(&text) else { continue };
                match parsed {
                    CdpMessage::Response { id, .. } => {
                        if let Some(sender) = reader_inner.pending.lock().remove(&id) {
                            let _ = sender.send(parsed);
                        }
                    }
                    CdpMessage::Event { ref method, ref params } => {
                        dispatch_event(&reader_inner, method, params);
                    }
                }
            }
        });

        Ok(DebugSessionHandle { inner })
    }
}

fn dispatch_event(inner: &SessionInner, method: &str, params: &serde_json::Value) {
    let event = match method {
        "Runtime.consoleAPICalled" => ConsoleEvent {
            level: params
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("log")
                .to_string(),
            message: params.to_string(),
            is_exception: false,
        },
        "Runtime.exceptionThrown" => ConsoleEvent {
            level: "error".to_string(),
            message: params.to_string(),
            is_exception: true,
        },
        _ => return,
    };
    if let Some(tx) = inner.console_tx.lock().as_ref() {
        if tx.send(event).is_err() {
            warn!("console subscriber dropped its receiver");
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    //! An in-memory [`DebugTransport`] for Session Adapter tests — no
    //! network sockets, no real browser (SPEC_FULL §8).
    use super::*;
    use std::sync::Mutex;

    pub type EvalResponder = dyn Fn(&str) -> EvaluateOutcome + Send + Sync;

    pub struct MockDebugTransport {
        pub tabs: Mutex<Vec<TabInfo>>,
        pub responder: Arc<EvalResponder>,
    }

    impl MockDebugTransport {
        pub fn new(tabs: Vec<TabInfo>, responder: Arc<EvalResponder>) -> Self {
            Self { tabs: Mutex::new(tabs), responder }
        }
    }

    #[async_trait]
    impl DebugTransport for MockDebugTransport {
        async fn list_tabs(&self, _port: u16) -> Result<Vec<TabInfo>, DebugError> {
            Ok(self.tabs.lock().unwrap().clone())
        }

        async fn attach(&self, _tab: &TabInfo) -> Result<DebugSessionHandle, DebugError> {
            let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
            let inner = Arc::new(SessionInner {
                next_id: AtomicU64::new(1),
                pending: SyncMutex::new(HashMap::new()),
                outbound: outbound_tx,
                console_tx: SyncMutex::new(None),
            });
            let responder = self.responder.clone();
            let loop_inner = inner.clone();
            tokio::spawn(async move {
                while let Some(message) = outbound_rx.recv().await {
                    let Message::Text(text) = message else { continue };
                    let Ok(request) = serde_json::from_str::<CdpRequest>(&text) else { continue };
                    let expression = request.params.get("expression").and_then(|v| v.as_str()).unwrap_or("");
                    let outcome = (responder)(expression);
                    let response = match outcome {
                        Ok(value) => CdpMessage::Response {
                            id: request.id,
                            result: Some(serde_json::json!({ "result": { "type": "object", "value": value } })),
                            error: None,
                        },
                        Err(DebugError::Exception(msg)) => CdpMessage::Response {
                            id: request.id,
                            result: None,
                            error: Some(cdp::CdpError { code: -1, message: msg }),
                        },
                        Err(DebugError::Timeout(_)) => continue,
                        Err(other) => CdpMessage::Response {
                            id: request.id,
                            result: None,
                            error: Some(cdp::CdpError { code: -2, message: other.to_string() }),
                        },
                    };
                    if let Some(sender) = loop_inner.pending.lock().remove(&request.id) {
                        let _ = sender.send(response);
                    }
                }
            });
            Ok(DebugSessionHandle { inner })
        }
    }
}
