//! HTTP server: accept loop and per-connection serving

use axum::Router;
use axum::extract::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tower::Service;

/// HTTP server serving the relay router over arbitrary byte streams
#[derive(Clone, Debug)]
pub struct HttpServer {
    router: Router<()>,
}

impl HttpServer {
    /// Create a new HTTP server with the given router
    pub fn new(router: Router<()>) -> Self {
        Self { router }
    }

    /// Handle a stream
    #[tracing::instrument(name = "http.handle_stream", skip_all)]
    pub async fn handle_stream<S>(&self, stream: S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let router = self.router.clone();
        let io = TokioIo::new(stream);

        let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
            router.clone().call(request)
        });

        // HTTP/1 and HTTP/2 on the same connection
        let result = server::conn::auto::Builder::new(TokioExecutor::new())
            .serve_connection(io, hyper_service)
            .await;

        match result {
            Ok(()) => {
                debug!("Stream handling completed successfully");
                Ok(())
            }
            Err(e) => {
                debug!("HTTP connection error: {}", e);
                Err(anyhow::anyhow!("HTTP connection error: {}", e))
            }
        }
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!("Listening on http://{}", local_addr);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested; no longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(connection) => connection,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_stream(stream).await {
                            debug!(peer = %peer, "Connection closed with error: {}", e);
                        }
                    });
                }
            }
        }
    }
}
