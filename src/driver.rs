use crate::codec::DelimiterCodec;
use crate::config::HubConfig;
use crate::connection::{Connection, FrameSink, MonitorConfig};
use crate::error::Result;
use crate::hub::Hub;
use crate::protocol::DELIMITER;
use crate::scheduler::RefreshScheduler;
use crate::serial::open_serial;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

/// A running driver session: transport, frame dispatch and periodic refresh
///
/// # Example
///
/// ```no_run
/// use xantech_digi5::{Digi5Driver, HubConfig, ZoneCount};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HubConfig::builder()
///         .serial_port("/dev/ttyUSB0")
///         .zone_count(ZoneCount::Six)
///         .build();
///
///     let driver = Digi5Driver::start(config).await?;
///     driver.hub().set_volume(2, 10)?;
///
///     driver.stop().await;
///     Ok(())
/// }
/// ```
pub struct Digi5Driver {
    hub: Hub,
    connection: Arc<Connection>,
    scheduler: RefreshScheduler,
    dispatcher: JoinHandle<()>,
}

impl Digi5Driver {
    /// Open the configured serial port and start the session
    pub async fn start(config: HubConfig) -> Result<Self> {
        config.validate()?;
        let port = open_serial(&config.serial_port, config.baud_rate)?;
        Self::start_with_io(config, port).await
    }

    /// Start the session over an already open byte stream
    pub async fn start_with_io<T>(config: HubConfig, io: T) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        config.validate()?;

        let codec = DelimiterCodec::new(DELIMITER as u8, config.include_delimiter);
        let monitor = (config.probe_interval_ms > 0).then(|| MonitorConfig {
            probe: config.probe_request.clone(),
            interval: config.probe_interval(),
            timeout: config.probe_timeout(),
        });

        let (connection, mut frames) = Connection::start(io, codec, monitor);
        let connection = Arc::new(connection);
        let sink: Arc<dyn FrameSink> = connection.clone();
        let interval = config.refresh_interval();
        let hub = Hub::new(config, sink);

        // Spawn task to feed inbound frames to the hub, one at a time
        let hub_clone = hub.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                hub_clone.handle_frame(&frame);
            }
            tracing::debug!("Frame dispatcher finished");
        });

        let scheduler = RefreshScheduler::start(Arc::new(hub.clone()), interval);

        tracing::info!(
            "Xantech DIGI-5 driver started with [{}] zones, refreshing every {:?}",
            hub.zone_count(),
            interval
        );

        Ok(Self {
            hub,
            connection,
            scheduler,
            dispatcher,
        })
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Whether the hub has answered since the line was last considered lost
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Stop refreshing and release the transport
    ///
    /// Commands sent through a `Hub` clone afterwards fail with
    /// `ConnectionClosed`.
    pub async fn stop(mut self) {
        self.scheduler.stop().await;
        self.dispatcher.abort();
        self.connection.close();
        tracing::info!("Xantech DIGI-5 driver stopped");
    }
}

impl Drop for Digi5Driver {
    fn drop(&mut self) {
        self.dispatcher.abort();
        self.connection.close();
    }
}
