use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::CryptoError;

use super::frame::{decode, encode, read_frame, write_frame, MAX_FRAME_SIZE};
use super::messages::{CallFrame, ReplyFrame, Request, Response};
use super::transport::Transport;

/// Frames queued for the writer task before callers start waiting
const OUTBOUND_QUEUE: usize = 64;

type Reply = Result<Response, CryptoError>;

/// Outstanding calls by sequence number; `None` once the connection is gone
type Pending = Arc<Mutex<Option<HashMap<u64, oneshot::Sender<Reply>>>>>;

/// Transport to a crypto service over a single multiplexed stream
///
/// Calls are tagged with a sequence number so any number of them can be
/// in flight at once; replies are routed back by that number. Dropping
/// a call's future forgets its slot and a late reply is discarded.
pub struct TcpTransport {
    next_seq: AtomicU64,
    pending: Pending,
    outbound: mpsc::Sender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self.pending.lock().as_ref().map(HashMap::len);
        f.debug_struct("TcpTransport")
            .field("next_seq", &self.next_seq)
            .field("in_flight", &in_flight)
            .finish()
    }
}

impl TcpTransport {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, CryptoError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tracing::debug!("connected to crypto service at {:?}", stream.peer_addr().ok());
        Ok(Self::from_stream(stream))
    }

    /// Run the call protocol over an already established stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut recv, mut send) = tokio::io::split(stream);
        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        let (outbound, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE);

        let writer_pending = pending.clone();
        let writer = tokio::spawn(async move {
            while let Some(bytes) = outbound_rx.recv().await {
                if let Err(e) = write_frame(&mut send, &bytes).await {
                    tracing::warn!("crypto service write failed: {}", e);
                    close_pending(&writer_pending, "connection write failed");
                    return;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader = tokio::spawn(async move {
            loop {
                let bytes = match read_frame(&mut recv).await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => {
                        tracing::debug!("crypto service closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("crypto service read failed: {}", e);
                        break;
                    }
                };
                let frame: ReplyFrame = match decode(&bytes) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("malformed reply from crypto service: {}", e);
                        break;
                    }
                };
                let waiter = reader_pending
                    .lock()
                    .as_mut()
                    .and_then(|map| map.remove(&frame.seq));
                match waiter {
                    // receiver may already be gone if the call was canceled
                    Some(tx) => {
                        let _ = tx.send(frame.reply);
                    }
                    None => tracing::trace!("discarding reply for abandoned call {}", frame.seq),
                }
            }
            close_pending(&reader_pending, "connection closed");
        });

        Self {
            next_seq: AtomicU64::new(0),
            pending,
            outbound,
            reader,
            writer,
        }
    }
}

/// Fail every outstanding call and refuse new ones
fn close_pending(pending: &Pending, reason: &str) {
    let Some(waiters) = pending.lock().take() else {
        return;
    };
    for (_, tx) in waiters {
        let _ = tx.send(Err(CryptoError::transport(reason)));
    }
}

/// Removes a call's slot when the call finishes or is dropped
struct PendingGuard<'a> {
    pending: &'a Pending,
    seq: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(map) = self.pending.lock().as_mut() {
            map.remove(&self.seq);
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, request: Request) -> Result<Response, CryptoError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let method = request.method();
        let bytes = encode(&CallFrame { seq, request })?;
        // only this call fails; the writer treats a bad frame as a dead connection
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(CryptoError::transport(format!(
                "{} request of {} bytes exceeds frame limit",
                method,
                bytes.len()
            )));
        }

        let (tx, rx) = oneshot::channel();
        match self.pending.lock().as_mut() {
            Some(map) => {
                map.insert(seq, tx);
            }
            None => return Err(CryptoError::transport("connection closed")),
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            seq,
        };

        tracing::trace!("sending {} as call {}", method, seq);
        self.outbound
            .send(bytes)
            .await
            .map_err(|_| CryptoError::transport("connection closed"))?;

        rx.await
            .map_err(|_| CryptoError::transport("connection closed"))?
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}
