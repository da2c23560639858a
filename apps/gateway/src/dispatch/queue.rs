//! Queue request/reply transport on Redis lists.
//!
//! A request `{id, pattern, data, replyTo}` is pushed onto the domain's queue
//! list; the consumer pushes `{id, response, err, isDisposed}` onto the list
//! named by `replyTo`. The gateway polls that list until a disposed reply for
//! its id arrives or the timeout expires.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{backend_error_from_value, BackendCall, BackendDomain, BackendReply, Transport, TransportKind};
use crate::AppError;

const POLL_MIN: Duration = Duration::from_millis(5);
const POLL_MAX: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRequest {
    pub id: String,
    pub pattern: String,
    pub data: Value,
    pub reply_to: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueReply {
    pub id: String,
    #[serde(default)]
    pub response: Value,
    #[serde(default)]
    pub err: Value,
    #[serde(default = "disposed_default")]
    pub is_disposed: bool,
}

fn disposed_default() -> bool {
    true
}

/// Shared broker connection, opened on first use.
pub struct QueueBroker {
    client: Client,
    manager: OnceCell<ConnectionManager>,
}

impl QueueBroker {
    /// Validate the URL without connecting.
    pub fn new(broker_url: &str) -> Result<Self, AppError> {
        let client = Client::open(broker_url)
            .map_err(|err| AppError::config(format!("Invalid BROKER_URL: {err}")))?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, AppError> {
        self.manager
            .get_or_try_init(|| async { ConnectionManager::new(self.client.clone()).await })
            .await
            .cloned()
            .map_err(|err| {
                warn!(error = %err, "message broker connection failed");
                AppError::backend_unavailable("Message broker is unavailable")
            })
    }
}

pub struct QueueTransport {
    domain: BackendDomain,
    queue: String,
    timeout: Duration,
    broker: std::sync::Arc<QueueBroker>,
}

impl QueueTransport {
    pub fn new(
        domain: BackendDomain,
        queue: impl Into<String>,
        timeout: Duration,
        broker: std::sync::Arc<QueueBroker>,
    ) -> Self {
        Self {
            domain,
            queue: queue.into(),
            timeout,
            broker,
        }
    }

    fn broker_error(&self, err: redis::RedisError) -> AppError {
        warn!(domain = %self.domain, error = %err, "message broker command failed");
        AppError::backend_unavailable(format!(
            "Cannot reach {} through the message broker",
            self.domain.service_name()
        ))
    }
}

/// Interpret one reply. `Ok(None)` means keep waiting.
pub fn interpret_reply(
    reply: &QueueReply,
    expected_id: &str,
    collected: &mut Value,
    default_message: &str,
) -> Result<Option<Value>, AppError> {
    if reply.id != expected_id {
        return Ok(None);
    }
    if !reply.err.is_null() {
        return Err(backend_error_from_value(&reply.err, default_message));
    }
    if !reply.response.is_null() {
        *collected = reply.response.clone();
    }
    Ok(reply.is_disposed.then(|| collected.clone()))
}

#[async_trait]
impl Transport for QueueTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Queue
    }

    async fn send(&self, call: &BackendCall) -> Result<BackendReply, AppError> {
        let id = Uuid::new_v4().to_string();
        let request = QueueRequest {
            id: id.clone(),
            pattern: call.operation.clone(),
            data: call.body.message_payload()?,
            reply_to: format!("{}:reply:{id}", self.queue),
        };
        let encoded = serde_json::to_string(&request)
            .map_err(|e| AppError::internal(format!("Failed to encode queue request: {e}")))?;

        let mut conn = self.broker.connection().await?;
        conn.lpush::<_, _, ()>(&self.queue, encoded)
            .await
            .map_err(|e| self.broker_error(e))?;

        let default_message = format!("{} error", self.domain.service_name());
        let deadline = Instant::now() + self.timeout;
        let mut poll = POLL_MIN;
        let mut collected = Value::Null;

        loop {
            let popped: Option<String> = conn
                .rpop(&request.reply_to, None)
                .await
                .map_err(|e| self.broker_error(e))?;

            match popped {
                Some(raw) => {
                    let reply: QueueReply = match serde_json::from_str(&raw) {
                        Ok(reply) => reply,
                        Err(err) => {
                            debug!(domain = %self.domain, error = %err, "ignoring malformed queue reply");
                            continue;
                        }
                    };
                    if let Some(body) = interpret_reply(&reply, &id, &mut collected, &default_message)? {
                        return Ok(BackendReply::for_method(&call.method, body));
                    }
                    poll = POLL_MIN;
                }
                None => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(AppError::backend_timeout(format!(
                            "{} request timeout",
                            self.domain.service_name()
                        )));
                    }
                    sleep(poll.min(deadline - now)).await;
                    poll = (poll * 2).min(POLL_MAX);
                }
            }
        }
    }
}
