use crate::device::DeviceChange;
use crate::error::{Digi5Error, Result};
use crate::types::{PropertyValue, ZoneNumber};
use crate::zone::ZoneValue;
use tokio::sync::broadcast;

/// A property of the hub changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    /// A zone property changed to the contained value
    Zone { zone: ZoneNumber, value: ZoneValue },

    /// A device identity field changed
    Device(DeviceChange),
}

impl StateUpdate {
    /// Host-facing property name, e.g. `ZoneVolumes`
    pub fn property_name(&self) -> &'static str {
        match self {
            StateUpdate::Zone { value, .. } => value.property_name(),
            StateUpdate::Device(change) => change.property_name(),
        }
    }

    /// Zone the change belongs to, `None` for device fields
    pub fn zone(&self) -> Option<ZoneNumber> {
        match self {
            StateUpdate::Zone { zone, .. } => Some(*zone),
            StateUpdate::Device(_) => None,
        }
    }

    /// New value
    pub fn value(&self) -> PropertyValue {
        match self {
            StateUpdate::Zone { value, .. } => value.value(),
            StateUpdate::Device(change) => change.value(),
        }
    }
}

/// Receiver for state updates
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    /// Create a new state receiver
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next state update
    ///
    /// Fails with `ConnectionClosed` once the hub has been dropped.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        self.rx
            .recv()
            .await
            .map_err(|e| match e {
                broadcast::error::RecvError::Closed => Digi5Error::ConnectionClosed,
                broadcast::error::RecvError::Lagged(n) => {
                    Digi5Error::ChannelError(format!("Lagged by {} messages", n))
                }
            })
    }

    /// Try to receive a state update without blocking
    ///
    /// Returns `None` if no message is available.
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(Digi5Error::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(Digi5Error::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}
