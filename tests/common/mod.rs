//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use traffic_gateway::config::watcher::InstanceUpdate;
use traffic_gateway::config::{GatewayConfig, RouteConfig, ServiceConfig};
use traffic_gateway::http::HttpServer;
use traffic_gateway::lifecycle::Shutdown;
use traffic_gateway::load_balancer::ServiceInstance;

pub const SERVICE: &str = "search-service";

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &str) {
    let response_str = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line(status),
        body.len(),
        body
    );
    let _ = socket.write_all(response_str.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Read the request head (request line and headers).
async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move || async move { (200, response.to_string()) }).await;
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let (status, body) = f().await;
                write_response(&mut socket, status, &body).await;
            });
        }
    });
}

/// Start a backend that answers 200 and records every request head it sees.
pub async fn start_recording_backend(addr: SocketAddr) -> Arc<Mutex<Vec<String>>> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                recorded.lock().unwrap().push(head);
                write_response(&mut socket, 200, "recorded").await;
            });
        }
    });

    seen
}

pub fn instance(id: &str, addr: SocketAddr) -> ServiceInstance {
    ServiceInstance::new(id, addr.ip().to_string(), addr.port())
}

/// Gateway config routing every path to [`SERVICE`].
pub fn gateway_config(proxy_addr: SocketAddr, instances: Vec<ServiceInstance>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.services.push(ServiceConfig {
        name: SERVICE.into(),
        instances,
        rate_limit: None,
        circuit_breaker: None,
    });
    config.routes.push(RouteConfig {
        name: "r1".into(),
        host: None,
        path_prefix: Some("/".into()),
        service: SERVICE.into(),
        strip_prefix: false,
        priority: 0,
    });
    config
}

/// Start the gateway in the background.
///
/// Returns the shutdown handle and the sender feeding instance updates.
pub async fn start_gateway(config: GatewayConfig) -> (Shutdown, mpsc::UnboundedSender<InstanceUpdate>) {
    let shutdown = Shutdown::new();
    let (update_tx, instance_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(&config).unwrap();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, instance_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    (shutdown, update_tx)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
