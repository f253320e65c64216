//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use provider_aggregator::registry::{
    NewSource, RegistryError, Source, SourceId, SourceRegistry, SourceUpdate, StatusUpdate,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock provider on an ephemeral port.
pub async fn start_programmable_provider<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 2048];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A mock provider whose response can be changed while it runs.
#[derive(Clone)]
pub struct MockProvider {
    pub addr: SocketAddr,
    response: Arc<Mutex<(u16, String)>>,
    delay: Arc<Mutex<Duration>>,
    hits: Arc<AtomicUsize>,
}

impl MockProvider {
    pub async fn start(status: u16, body: &str) -> Self {
        let response = Arc::new(Mutex::new((status, body.to_string())));
        let delay = Arc::new(Mutex::new(Duration::ZERO));
        let hits = Arc::new(AtomicUsize::new(0));

        let (r, d, h) = (response.clone(), delay.clone(), hits.clone());
        let addr = start_programmable_provider(move || {
            let response = r.lock().unwrap().clone();
            let delay = *d.lock().unwrap();
            h.fetch_add(1, Ordering::SeqCst);
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                response
            }
        })
        .await;

        Self {
            addr,
            response,
            delay,
            hits,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/api/config", self.addr)
    }

    pub fn respond(&self, status: u16, body: &str) {
        *self.response.lock().unwrap() = (status, body.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A provider document with the given router and service names.
pub fn document(routers: &[&str], services: &[&str]) -> String {
    let routers: serde_json::Map<String, serde_json::Value> = routers
        .iter()
        .map(|name| (name.to_string(), serde_json::json!({ "rule": format!("Host(`{name}.example.com`)"), "service": "svc" })))
        .collect();
    let services: serde_json::Map<String, serde_json::Value> = services
        .iter()
        .map(|name| (name.to_string(), serde_json::json!({ "loadBalancer": { "servers": [] } })))
        .collect();
    serde_json::json!({ "http": { "routers": routers, "services": services } }).to_string()
}

pub fn new_source(name: &str, url: &str, priority: i32) -> NewSource {
    NewSource {
        name: name.into(),
        url: url.into(),
        priority,
        refresh_interval: 30,
        is_active: true,
    }
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

/// A registry whose storage is down.
pub struct UnavailableRegistry;

#[async_trait::async_trait]
impl SourceRegistry for UnavailableRegistry {
    async fn list(&self) -> Result<Vec<Source>, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _id: SourceId) -> Result<Option<Source>, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".into()))
    }

    async fn create(&self, _source: NewSource) -> Result<Source, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".into()))
    }

    async fn update(&self, _id: SourceId, _update: SourceUpdate) -> Result<Source, RegistryError> {
        Err(RegistryError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _id: SourceId) -> Result<(), RegistryError> {
        Err(RegistryError::Unavailable("connection refused".into()))
    }

    async fn update_status(&self, _id: SourceId, _status: StatusUpdate) -> Result<(), RegistryError> {
        Err(RegistryError::Unavailable("connection refused".into()))
    }
}
