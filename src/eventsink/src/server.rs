use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::header::HOST;
use http::{HeaderMap, Method, Request};
use hyper::body::{Body, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::Level;

use crate::store::RecordStore;
use crate::{capture, retrieve, HttpResponse};

/// Accepts connections on `listener` until `shutdown` resolves, serving each
/// connection on its own task. Every connection shares `store`.
pub async fn serve<F>(
    listener: TcpListener,
    store: Arc<RecordStore>,
    tls: Option<TlsAcceptor>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    tracing::info!("Listening for events on: {}", listener.local_addr()?);

    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let store = Arc::clone(&store);
                let tls = tls.clone();

                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, addr, store, tls).await {
                        tracing::error!(
                            addr = ?addr,
                            "Error occurred while serving connection: {}",
                            e
                        );
                    }
                });
            }
        }
    }

    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    store: Arc<RecordStore>,
    tls: Option<TlsAcceptor>,
) -> anyhow::Result<()> {
    match tls {
        Some(acceptor) => {
            let stream = acceptor.accept(stream).await?;
            serve_io(stream, store).await?;
        }
        None => serve_io(stream, store).await?,
    }

    tracing::trace!(addr = ?addr, "Connection closed");

    Ok(())
}

async fn serve_io<S>(stream: S, store: Arc<RecordStore>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request: Request<Incoming>| {
        let store = Arc::clone(&store);
        async move { Ok::<_, Infallible>(handle(request, &store).await) }
    });

    let builder = auto::Builder::new(TokioExecutor::new());

    builder
        .serve_connection(TokioIo::new(stream), service)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

/// Dispatches a request by method. Methods other than `POST`, `GET` and
/// `DELETE` are acknowledged without touching the store.
pub async fn handle<B>(request: Request<B>, store: &RecordStore) -> HttpResponse
where
    B: Body + Unpin,
    B::Error: Display,
{
    if tracing::enabled!(Level::DEBUG) {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|host| host.to_str().ok())
            .unwrap_or_default();

        tracing::debug!(
            "{} {} {} {}",
            host,
            request.method(),
            request.uri(),
            correlation_summary(request.headers())
        );
    }

    match *request.method() {
        Method::POST => capture::capture(request, store).await,
        Method::GET => retrieve::retrieve(&request, store),
        Method::DELETE => retrieve::reset(store),
        _ => crate::empty_response(),
    }
}

/// `name=value` pairs for the request id and CloudEvents headers, first value
/// only
fn correlation_summary(headers: &HeaderMap) -> String {
    headers
        .keys()
        .filter(|name| {
            let name = name.as_str();
            name == "x-request-id" || name.starts_with("ce-")
        })
        .filter_map(|name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| format!("{}={}", name, value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
