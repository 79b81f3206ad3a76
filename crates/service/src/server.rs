use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use common::rpc::{decode, encode, handle_request, read_frame, write_frame, CallFrame, ReplyFrame};
use common::{CryptoError, LocalCrypto};

/// Replies queued for a connection's writer task
const REPLY_QUEUE: usize = 64;

/// Serves the crypto call protocol for one device engine
pub struct Server {
    listener: TcpListener,
    engine: Arc<LocalCrypto>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, engine: LocalCrypto) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e))?;
        Ok(Self {
            listener,
            engine: Arc::new(engine),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` changes
    pub async fn run(self, mut shutdown: watch::Receiver<()>) -> Result<(), ServerError> {
        tracing::info!("crypto service listening on {}", self.local_addr()?);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!("accepted connection from {}", peer);
                        let engine = self.engine.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, engine, shutdown).await {
                                tracing::warn!("connection from {} ended: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => tracing::error!("failed to accept connection: {}", e),
                },
                _ = shutdown.changed() => {
                    tracing::info!("crypto service shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Read calls off one connection, answering each on its own task
async fn serve_connection(
    stream: TcpStream,
    engine: Arc<LocalCrypto>,
    mut shutdown: watch::Receiver<()>,
) -> Result<(), CryptoError> {
    stream.set_nodelay(true)?;
    let (mut recv, mut send) = stream.into_split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ReplyFrame>(REPLY_QUEUE);

    let writer = tokio::spawn(async move {
        while let Some(frame) = reply_rx.recv().await {
            write_frame(&mut send, &encode(&frame)?).await?;
        }
        Ok::<_, CryptoError>(())
    });

    loop {
        let bytes = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            read = read_frame(&mut recv) => match read? {
                Some(bytes) => bytes,
                None => break,
            },
        };
        let call: CallFrame = decode(&bytes)?;
        tracing::trace!("call {} is {}", call.seq, call.request.method());

        let engine = engine.clone();
        let reply_tx = reply_tx.clone();
        tokio::spawn(async move {
            let reply = ReplyFrame {
                seq: call.seq,
                reply: handle_request(&engine, call.request),
            };
            // writer is gone once the connection failed
            let _ = reply_tx.send(reply).await;
        });
    }

    drop(reply_tx);
    writer.await.map_err(CryptoError::transport)?
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
