//! Direct RPC transport over a persistent TCP connection.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::debug;
use uuid::Uuid;

use super::codec::{FrameError, JsonFrameCodec};
use super::{backend_error_from_value, BackendCall, BackendDomain, BackendReply, Transport, TransportKind};
use crate::AppError;

type Connection = Framed<TcpStream, JsonFrameCodec>;

/// One connection per domain, opened lazily and reopened after any failure.
/// Calls are serialized on the connection.
pub struct RpcTransport {
    domain: BackendDomain,
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl RpcTransport {
    pub fn new(domain: BackendDomain, host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            domain,
            addr: format!("{host}:{port}"),
            timeout,
            conn: Mutex::new(None),
        }
    }

    fn unavailable(&self) -> AppError {
        let service = self.domain.service_name();
        AppError::backend_unavailable(format!(
            "Cannot connect to {service}. Please ensure {service} is running."
        ))
    }

    fn map_io(&self, err: &std::io::Error) -> AppError {
        match err.kind() {
            ErrorKind::TimedOut => self.timed_out(),
            _ => self.unavailable(),
        }
    }

    fn map_frame(&self, err: FrameError) -> AppError {
        match err {
            FrameError::Io(io) => self.map_io(&io),
            other => AppError::backend(502, format!("Malformed reply from {}: {other}", self.domain.service_name())),
        }
    }

    fn timed_out(&self) -> AppError {
        AppError::backend_timeout(format!("{} request timeout", self.domain.service_name()))
    }

    async fn exchange(&self, conn: &mut Connection, id: &str, request: Value) -> Result<Value, AppError> {
        conn.send(request).await.map_err(|e| self.map_frame(e))?;

        let mut response = Value::Null;
        loop {
            let frame = match conn.next().await {
                Some(frame) => frame.map_err(|e| self.map_frame(e))?,
                None => return Err(self.unavailable()),
            };

            if frame.get("id").and_then(Value::as_str) != Some(id) {
                debug!(domain = %self.domain, "skipping rpc frame for another request");
                continue;
            }

            if let Some(err) = frame.get("err").filter(|e| !e.is_null()) {
                let default = format!("{} error", self.domain.service_name());
                return Err(backend_error_from_value(err, &default));
            }

            if let Some(value) = frame.get("response").filter(|v| !v.is_null()) {
                response = value.clone();
            }

            if frame.get("isDisposed").and_then(Value::as_bool).unwrap_or(false) {
                return Ok(response);
            }
        }
    }
}

#[async_trait]
impl Transport for RpcTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Rpc
    }

    async fn send(&self, call: &BackendCall) -> Result<BackendReply, AppError> {
        let data = call.body.message_payload()?;
        let id = Uuid::new_v4().to_string();
        let request = json!({ "pattern": call.operation, "data": data, "id": id });

        let mut guard = self.conn.lock().await;

        let outcome = timeout(self.timeout, async {
            if guard.is_none() {
                let stream = TcpStream::connect(&self.addr)
                    .await
                    .map_err(|e| self.map_io(&e))?;
                stream.set_nodelay(true).ok();
                *guard = Some(Framed::new(stream, JsonFrameCodec));
            }
            match guard.as_mut() {
                Some(conn) => self.exchange(conn, &id, request).await,
                None => Err(self.unavailable()),
            }
        })
        .await;

        let result = outcome.unwrap_or_else(|_| Err(self.timed_out()));

        // Connection state is unknown after transport-level failures.
        if matches!(
            result,
            Err(AppError::BackendUnavailable { .. } | AppError::BackendTimeout { .. })
        ) || matches!(result, Err(AppError::Backend { status: 502, .. }))
        {
            *guard = None;
        }

        result.map(|body| BackendReply::for_method(&call.method, body))
    }
}
