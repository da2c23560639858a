//! Minimal HTTP backend on an ephemeral port that records what it receives.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::Value;

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    /// Path plus query string
    pub uri: String,
    pub authorization: Option<String>,
    pub user_id: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl SeenRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("backend received JSON")
    }
}

type Responder = dyn Fn(&SeenRequest) -> (u16, Value) + Send + Sync;

struct Shared {
    seen: Mutex<Vec<SeenRequest>>,
    respond: Box<Responder>,
}

pub struct FakeHttpBackend {
    pub port: u16,
    shared: Arc<Shared>,
    handle: ServerHandle,
}

impl FakeHttpBackend {
    /// Start a backend answering every request via `respond`.
    pub fn start(respond: impl Fn(&SeenRequest) -> (u16, Value) + Send + Sync + 'static) -> Self {
        let shared = Arc::new(Shared {
            seen: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        });

        let data = web::Data::from(shared.clone());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .app_data(web::PayloadConfig::new(32 * 1024 * 1024))
                .default_service(web::to(record))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind fake backend");

        let port = server.addrs()[0].port();
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            port,
            shared,
            handle,
        }
    }

    /// Always answer `status` with `body`.
    pub fn fixed(status: u16, body: Value) -> Self {
        Self::start(move |_| (status, body.clone()))
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.shared.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> SeenRequest {
        self.requests().pop().expect("backend saw a request")
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn record(req: HttpRequest, body: Bytes, shared: web::Data<Shared>) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let seen = SeenRequest {
        method: req.method().to_string(),
        uri: req.uri().to_string(),
        authorization: header("authorization"),
        user_id: header("x-user-id"),
        content_type: header("content-type"),
        body,
    };
    let (status, reply) = (shared.respond)(&seen);
    shared.seen.lock().unwrap().push(seen);

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if reply.is_null() {
        HttpResponse::build(status).finish()
    } else {
        HttpResponse::build(status).json(reply)
    }
}

/// A localhost port nothing is listening on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("ephemeral addr").port();
    drop(listener);
    port
}
