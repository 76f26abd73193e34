//! Rust library for controlling Xantech DIGI-5 multi-zone audio hubs
//!
//! This library provides an async driver for the DIGI-5 RS-232 control
//! protocol. It supports:
//!
//! - Power, mute, source and volume control per zone
//! - Balance, bass and treble adjustment
//! - Do-not-disturb, dynamic range control, loudness and whole-house toggles
//! - Periodic status refresh with firmware-gated confirmation queries
//! - Device identity and firmware version tracking
//! - Real-time state update subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use xantech_digi5::{Digi5Driver, HubConfig, ZoneCount};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HubConfig::builder()
//!         .serial_port("/dev/ttyUSB0")
//!         .zone_count(ZoneCount::Six)
//!         .source_names(["Tuner", "CD", "Streamer", "TV", "Local"])
//!         .build();
//!
//!     let driver = Digi5Driver::start(config).await?;
//!     let hub = driver.hub();
//!
//!     hub.turn_on(1)?;
//!     hub.set_source_by_name(1, "Streamer")?;
//!     hub.set_volume(1, 12)?;
//!
//!     // Subscribe to state updates
//!     let mut updates = hub.subscribe();
//!     while let Ok(update) = updates.recv().await {
//!         println!("{} {:?} = {}", update.property_name(), update.zone(), update.value());
//!         break; // Just show one update
//!     }
//!
//!     driver.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transport
//!
//! Any `AsyncRead + AsyncWrite` stream can stand in for the serial port:
//!
//! ```no_run
//! use xantech_digi5::{Digi5Driver, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = tokio::net::TcpStream::connect("192.168.1.50:4001").await?;
//!     let driver = Digi5Driver::start_with_io(HubConfig::default(), stream).await?;
//!     driver.hub().turn_all_zones_off()?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Driver**: Session lifecycle (transport, dispatch, refresh)
//! - **Hub**: High-level control API and change notifications
//! - **State**: Device identity and per-zone state, changed only by hub reports
//! - **Parser**: Inbound frame decoding
//! - **Protocol**: Wire frame construction
//! - **Connection**: Framed byte-stream handling and liveness monitoring

mod codec;
mod config;
mod connection;
mod device;
mod driver;
mod error;
mod hub;
mod parser;
mod protocol;
mod scheduler;
mod serial;
mod state;
mod subscription;
mod types;
mod zone;

// Public exports
pub use codec::{DelimiterCodec, InboundFrame};
pub use config::{HubConfig, HubConfigBuilder, ZoneCount, DEFAULT_BAUD_RATE};
pub use connection::{Connection, FrameSink, MonitorConfig};
pub use device::{derive_firmware_version, DeviceChange, DeviceState};
pub use driver::Digi5Driver;
pub use error::{Digi5Error, Result};
pub use hub::Hub;
pub use parser::{parse_frame, DeviceStatusReport, Response, ZoneReport};
pub use protocol::{GlobalCommand, Opcode};
pub use scheduler::{Refresh, RefreshScheduler};
pub use serial::open_serial;
pub use state::HubState;
pub use subscription::{StateReceiver, StateUpdate};
pub use types::{PropertyValue, SourceNumber, ToneLevel, VolumeLevel, ZoneNumber};
pub use zone::{ZoneCommand, ZoneState, ZoneValue, FIRMWARE_GATE};
