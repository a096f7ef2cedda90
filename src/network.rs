//! Network access used by the worker.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};

use crate::config::Config;
use crate::http::{Request, Response};

/// The network as seen from the worker.
///
/// `Err` means the request never produced a response (offline, DNS failure,
/// timeout). Any HTTP status, including 4xx and 5xx, is an `Ok` response.
#[async_trait]
pub trait Network: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Network backed by a reqwest client.
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
}

impl HttpNetwork {
  pub fn new(config: &Config) -> Result<Self> {
    let mut builder =
      reqwest::Client::builder().user_agent(concat!("sst-worker/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = config.fetch_timeout() {
      builder = builder.timeout(timeout);
    }

    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());

    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
      builder = builder.body(body.clone());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?;

    Ok(Response {
      status,
      headers,
      body: body.to_vec(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::{Duration, Instant};
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;
  use url::Url;

  async fn listener() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    (listener, url)
  }

  #[tokio::test]
  async fn test_timeout_is_a_network_failure() {
    let (listener, base) = listener().await;
    tokio::spawn(async move {
      // Accept and then say nothing
      let (_socket, _) = listener.accept().await.unwrap();
      tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let config = Config {
      fetch_timeout_secs: Some(1),
      ..Config::default()
    };
    let network = HttpNetwork::new(&config).unwrap();

    let started = Instant::now();
    let result = network
      .fetch(&Request::get(base.join("api/emergencias/").unwrap()))
      .await;

    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(10));
  }

  #[tokio::test]
  async fn test_error_status_is_a_response() {
    let (listener, base) = listener().await;
    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 4096];
      let _ = socket.read(&mut buf).await.unwrap();
      socket
        .write_all(
          b"HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\nContent-Length: 11\r\nConnection: close\r\n\r\nmaintenance",
        )
        .await
        .unwrap();
    });

    let network = HttpNetwork::new(&Config::default()).unwrap();
    let response = network
      .fetch(&Request::get(base.join("reportes/").unwrap()))
      .await
      .unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.ok());
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert_eq!(response.text(), "maintenance");
  }
}
