use crate::codec::{DelimiterCodec, InboundFrame};
use crate::error::{Digi5Error, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::codec::{FramedRead, FramedWrite};

/// Outbound side of the transport as seen by the protocol engine
pub trait FrameSink: Send + Sync {
    /// Queue one complete frame for sending; never blocks
    fn send_frame(&self, frame: &str) -> Result<()>;
}

/// Liveness probe settings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Frame sent on every probe
    pub probe: String,
    /// Time between probes
    pub interval: Duration,
    /// How long after a probe some frame must have arrived
    pub timeout: Duration,
}

/// Line state shared between the reader and the monitor
#[derive(Default)]
struct LinkState {
    alive: AtomicBool,
    frames_seen: AtomicU64,
}

impl LinkState {
    fn frame_received(&self) {
        self.frames_seen.fetch_add(1, Ordering::Relaxed);
        if !self.alive.swap(true, Ordering::Relaxed) {
            tracing::info!("DIGI-5 connection established");
        }
    }

    fn lost(&self) {
        if self.alive.swap(false, Ordering::Relaxed) {
            tracing::warn!("DIGI-5 connection lost");
        }
    }
}

/// Byte-stream connection to the hub
///
/// Owns a writer task fed through an unbounded queue, a reader task that
/// splits inbound bytes into frames, and an optional liveness monitor.
/// Closing the connection ends all three and releases the stream.
pub struct Connection {
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    link: Arc<LinkState>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    monitor: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start the connection over `io`
    ///
    /// Returns the connection together with the stream of inbound frames.
    pub fn start<T>(
        io: T,
        codec: DelimiterCodec,
        monitor: Option<MonitorConfig>,
    ) -> (Self, mpsc::UnboundedReceiver<InboundFrame>)
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(io);
        let mut framed_write = FramedWrite::new(write, codec.clone());
        let mut framed_read = FramedRead::new(read, codec);

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<InboundFrame>();
        let link = Arc::new(LinkState::default());

        // Spawn task to forward outgoing frames to the line
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                tracing::debug!("Sending: {}", frame);
                if let Err(e) = framed_write.send(frame).await {
                    tracing::error!("Failed to send frame: {}", e);
                    break;
                }
            }
        });

        // Spawn task to split incoming bytes into frames
        let link_clone = link.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = framed_read.next().await {
                match result {
                    Ok(frame) => {
                        tracing::debug!("Received: {}", frame.text);
                        link_clone.frame_received();
                        if frame_tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Serial read error: {}", e);
                        break;
                    }
                }
            }
            link_clone.lost();
            tracing::debug!("Connection reader finished");
        });

        let monitor = monitor.map(|config| {
            let tx = tx.clone();
            let link = link.clone();
            tokio::spawn(async move {
                loop {
                    sleep(config.interval).await;
                    let seen = link.frames_seen.load(Ordering::Relaxed);
                    if tx.send(config.probe.clone()).is_err() {
                        break;
                    }
                    sleep(config.timeout).await;
                    if link.frames_seen.load(Ordering::Relaxed) == seen {
                        link.lost();
                    }
                }
            })
        });

        let connection = Self {
            tx: Mutex::new(Some(tx)),
            link,
            writer,
            reader,
            monitor,
        };
        (connection, frame_rx)
    }

    /// Whether a frame has arrived since the line was last considered lost
    pub fn is_connected(&self) -> bool {
        self.link.alive.load(Ordering::Relaxed)
    }

    /// Stop all tasks and release the stream; later sends fail with
    /// `ConnectionClosed`
    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(monitor) = &self.monitor {
            monitor.abort();
        }
        self.reader.abort();
        self.writer.abort();
    }
}

impl FrameSink for Connection {
    fn send_frame(&self, frame: &str) -> Result<()> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx
                .send(frame.to_string())
                .map_err(|_| Digi5Error::ConnectionClosed),
            None => Err(Digi5Error::ConnectionClosed),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (local, mut remote) = tokio::io::duplex(256);
        let (connection, mut frames) = Connection::start(local, DelimiterCodec::default(), None);

        connection.send_frame("?1VO+").unwrap();
        let mut buf = [0u8; 5];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"?1VO+");

        remote.write_all(b"?1VO12+").await.unwrap();
        let frame = frames.recv().await.unwrap();
        assert_eq!(frame.text, "?1VO12+");
        assert!(connection.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_sends_probe_and_detects_silence() {
        let (local, mut remote) = tokio::io::duplex(256);
        let monitor = MonitorConfig {
            probe: "?DI+".to_string(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(1),
        };
        let (connection, mut frames) =
            Connection::start(local, DelimiterCodec::default(), Some(monitor));

        remote.write_all(b"?1PR1+").await.unwrap();
        frames.recv().await.unwrap();
        assert!(connection.is_connected());

        let mut buf = [0u8; 4];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"?DI+");

        sleep(Duration::from_secs(2)).await;
        assert!(!connection.is_connected());
    }

    #[tokio::test]
    async fn test_close_releases_stream() {
        let (local, mut remote) = tokio::io::duplex(256);
        let (connection, _frames) = Connection::start(local, DelimiterCodec::default(), None);

        connection.close();
        assert!(matches!(
            connection.send_frame("?1VO+"),
            Err(Digi5Error::ConnectionClosed)
        ));

        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(Duration::from_secs(1), remote.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }
}
