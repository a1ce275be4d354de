//! Relay server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::router::proxy_router;
use super::{ProxyConfig, ProxyError};

/// Handle to a running relay.
pub struct ProxyServer {
    addr: SocketAddr,
    backend_url: String,
    started_at: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ProxyServer {
    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// RFC 3339 start time.
    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Relay shutdown signal sent");
        }
    }

    /// Signal shutdown and wait for in-flight requests to drain.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ProxyServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind `addr`, mount `proxy_router(config)` and serve in the background.
pub async fn start_proxy_server(
    config: ProxyConfig,
    addr: SocketAddr,
) -> Result<ProxyServer, ProxyError> {
    let backend_url = config.backend_url.clone();
    let app = proxy_router(config)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ProxyError::Bind { addr, source })?;
    let addr = listener
        .local_addr()
        .map_err(|source| ProxyError::Bind { addr, source })?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn({
        let backend_url = backend_url.clone();
        async move {
            let shutdown_signal = async move {
                let _ = shutdown_rx.await;
                tracing::info!("Relay received shutdown signal");
            };

            tracing::info!(%addr, backend = %backend_url, "Relay started");

            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal)
                .await
            {
                tracing::error!("Relay server error: {e}");
            }

            tracing::info!("Relay stopped");
        }
    });

    Ok(ProxyServer {
        addr,
        backend_url,
        started_at: chrono::Utc::now().to_rfc3339(),
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use crate::test_support::FakeBackend;

    fn any_port() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn start_relay_and_stop() {
        let backend = FakeBackend::start().await;
        let server = start_proxy_server(ProxyConfig::new(&backend.url), any_port())
            .await
            .expect("relay should start");

        assert!(server.local_addr().port() > 0);
        assert!(!server.started_at().is_empty());
        assert_eq!(server.backend_url(), backend.url);

        let url = format!("http://{}/api/backend/health", server.local_addr());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get("x-proxied-from").unwrap(),
            backend.url.as_str()
        );
        drop(resp);

        let addr = server.local_addr();
        server.stop().await;
        assert!(reqwest::get(format!("http://{addr}/api/backend/health"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn bind_conflict_reported() {
        let backend = FakeBackend::start().await;
        let first = start_proxy_server(ProxyConfig::new(&backend.url), any_port())
            .await
            .unwrap();

        let second = start_proxy_server(ProxyConfig::new(&backend.url), first.local_addr()).await;
        assert!(matches!(second, Err(ProxyError::Bind { .. })));
    }

    #[tokio::test]
    async fn invalid_prefix_fails_before_binding() {
        let config = ProxyConfig::new("http://127.0.0.1:1").with_prefix("/");
        assert!(matches!(
            start_proxy_server(config, any_port()).await,
            Err(ProxyError::InvalidPrefix(_))
        ));
    }
}
