use std::net::SocketAddr;
use std::sync::Arc;

use eventsink::store::RecordStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;

/// An in-process recorder bound to an ephemeral port, with direct access to
/// its store
pub struct TestServer {
    addr: SocketAddr,
    store: Arc<RecordStore>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with_tls(None).await
    }

    pub async fn start_with_tls(tls: Option<TlsAcceptor>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let store = Arc::new(RecordStore::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(eventsink::server::serve(
            listener,
            Arc::clone(&store),
            tls,
            async move {
                let _ = shutdown_rx.await;
            },
        ));

        Ok(Self {
            addr,
            store,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
