use crate::codec::InboundFrame;
use crate::config::HubConfig;
use crate::connection::FrameSink;
use crate::error::Result;
use crate::protocol::GlobalCommand;
use crate::scheduler::Refresh;
use crate::state::HubState;
use crate::subscription::{StateReceiver, StateUpdate};
use crate::types::ZoneNumber;
use crate::zone::{ZoneCommand, ZoneState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tokio::sync::broadcast;

struct HubInner {
    sink: Arc<dyn FrameSink>,
    state: Mutex<HubState>,
    updates: broadcast::Sender<StateUpdate>,
    config: HubConfig,
}

/// Handle for controlling and observing a DIGI-5 hub
///
/// Cheap to clone; all clones share the same zone state and transport.
/// Every command takes a 1-based zone number. Unknown zone numbers and
/// out-of-range arguments are logged and otherwise ignored, so the
/// `Result` of a command only reports transport failures.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Create a hub that sends through `sink`
    pub fn new(config: HubConfig, sink: Arc<dyn FrameSink>) -> Self {
        let (updates, _) = broadcast::channel(100);
        let state = HubState::new(config.zone_count());
        Self {
            inner: Arc::new(HubInner {
                sink,
                state: Mutex::new(state),
                updates,
                config,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send_all(&self, frames: &[String]) -> Result<()> {
        for frame in frames {
            self.inner.sink.send_frame(frame)?;
        }
        Ok(())
    }

    /// Subscribe to property changes
    ///
    /// # Example
    ///
    /// ```no_run
    /// use xantech_digi5::{Digi5Driver, HubConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let driver = Digi5Driver::start(HubConfig::default()).await?;
    ///     let mut rx = driver.hub().subscribe();
    ///
    ///     while let Ok(update) = rx.recv().await {
    ///         println!("{} {:?} = {}", update.property_name(), update.zone(), update.value());
    ///     }
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.inner.updates.subscribe())
    }

    /// Apply one inbound frame and notify subscribers of any changes
    pub fn handle_frame(&self, frame: &InboundFrame) {
        let mut state = self.state();
        for update in state.handle_frame(frame) {
            tracing::debug!(
                "{} changed for zone {:?}: {}",
                update.property_name(),
                update.zone(),
                update.value()
            );
            let _ = self.inner.updates.send(update);
        }
    }

    // ========== Accessors ==========

    /// Settings the hub was created with
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Number of configured zones
    pub fn zone_count(&self) -> u8 {
        self.inner.config.zone_count()
    }

    /// Snapshot of one zone
    pub fn zone(&self, zone: ZoneNumber) -> Option<ZoneState> {
        self.state().zone(zone).cloned()
    }

    /// Snapshot of every zone
    pub fn zones(&self) -> Vec<ZoneState> {
        self.state().zones().to_vec()
    }

    /// Device type from the last status block
    pub fn device_type(&self) -> Option<String> {
        self.state().device().device_type().map(str::to_string)
    }

    /// Device code from the last status block
    pub fn device_code(&self) -> Option<String> {
        self.state().device().device_code().map(str::to_string)
    }

    /// Hardware code from the last status block
    pub fn hardware_code(&self) -> Option<String> {
        self.state().device().hardware_code().map(str::to_string)
    }

    /// Firmware version string as reported by the hub
    pub fn firmware_version(&self) -> Option<String> {
        self.state().device().firmware_version().map(str::to_string)
    }

    /// Integer firmware version used to gate confirmation queries
    pub fn hub_firmware_version(&self) -> u32 {
        self.state().firmware()
    }

    /// Time of the last device status block
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.state().device().last_updated()
    }

    /// Configured friendly source names, source 1 first
    pub fn source_names(&self) -> &[String] {
        &self.inner.config.source_names
    }

    /// Configured friendly zone names, zone 1 first
    pub fn zone_names(&self) -> &[String] {
        &self.inner.config.zone_names
    }

    /// Friendly name of a zone, if configured
    pub fn zone_name(&self, zone: ZoneNumber) -> Option<&str> {
        self.inner.config.zone_name(zone)
    }

    /// Friendly name of the source currently selected on a zone
    pub fn zone_source_name(&self, zone: ZoneNumber) -> Option<String> {
        let source = self.zone(zone)?.source();
        self.inner
            .config
            .source_name(i32::from(source))
            .map(str::to_string)
    }

    // ========== Commands ==========

    /// Send a command to one zone, followed by its confirmation query when
    /// the hub firmware allows it
    pub fn send_zone_command(&self, zone: ZoneNumber, command: ZoneCommand) -> Result<()> {
        let state = self.state();
        let Some(frames) = state.command_frames(zone, command) else {
            tracing::error!("Invalid ZoneNumber [{}] in {:?} call", zone, command);
            return Ok(());
        };
        self.send_all(&frames)
    }

    /// Switch a zone on or off
    pub fn set_power(&self, zone: ZoneNumber, on: bool) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetPower(on))
    }

    /// Switch a zone on
    pub fn turn_on(&self, zone: ZoneNumber) -> Result<()> {
        self.set_power(zone, true)
    }

    /// Switch a zone off
    pub fn turn_off(&self, zone: ZoneNumber) -> Result<()> {
        self.set_power(zone, false)
    }

    /// Flip a zone's power state
    pub fn toggle_power(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::TogglePower)
    }

    /// Power off every zone (`!AO+`)
    pub fn turn_all_zones_off(&self) -> Result<()> {
        self.send_all(&[GlobalCommand::AllOff.frame().to_string()])
    }

    /// Mute or unmute a zone
    pub fn set_mute(&self, zone: ZoneNumber, muted: bool) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetMute(muted))
    }

    /// Mute a zone
    pub fn mute(&self, zone: ZoneNumber) -> Result<()> {
        self.set_mute(zone, true)
    }

    /// Unmute a zone
    pub fn unmute(&self, zone: ZoneNumber) -> Result<()> {
        self.set_mute(zone, false)
    }

    /// Flip a zone's mute state
    pub fn toggle_mute(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::ToggleMute)
    }

    /// Select source 1..=5 (5 is the zone's local input)
    pub fn set_source(&self, zone: ZoneNumber, source: i32) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetSource(source))
    }

    /// Select a source by its configured friendly name
    pub fn set_source_by_name(&self, zone: ZoneNumber, name: &str) -> Result<()> {
        if self.state().zone(zone).is_none() {
            tracing::error!("Invalid ZoneNumber [{}] in SetSourceByName call", zone);
            return Ok(());
        }
        match self.inner.config.source_number(name) {
            Some(source) => self.set_source(zone, source),
            None => {
                tracing::error!("Invalid SourceName [{}] in SetSourceByName call", name);
                Ok(())
            }
        }
    }

    /// Step to the next source
    pub fn increment_source(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::IncrementSource)
    }

    /// Step to the previous source
    pub fn decrement_source(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::DecrementSource)
    }

    /// Set volume 0..=21
    pub fn set_volume(&self, zone: ZoneNumber, volume: i32) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetVolume(volume))
    }

    /// Raise volume by one step
    pub fn increment_volume(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::IncrementVolume)
    }

    /// Lower volume by one step
    pub fn decrement_volume(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::DecrementVolume)
    }

    /// Set balance -5 (left) ..= 5 (right)
    pub fn set_balance(&self, zone: ZoneNumber, balance: i32) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetBalance(balance))
    }

    /// Shift balance one step to the left
    pub fn step_balance_left(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::StepBalanceLeft)
    }

    /// Shift balance one step to the right
    pub fn step_balance_right(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::StepBalanceRight)
    }

    /// Set bass -5..=5
    pub fn set_bass_level(&self, zone: ZoneNumber, level: i32) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetBassLevel(level))
    }

    /// Raise bass by one step
    pub fn increment_bass(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::IncrementBass)
    }

    /// Lower bass by one step
    pub fn decrement_bass(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::DecrementBass)
    }

    /// Set treble -5..=5
    pub fn set_treble_level(&self, zone: ZoneNumber, level: i32) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetTrebleLevel(level))
    }

    /// Raise treble by one step
    pub fn increment_treble(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::IncrementTreble)
    }

    /// Lower treble by one step
    pub fn decrement_treble(&self, zone: ZoneNumber) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::DecrementTreble)
    }

    /// Enable or disable do-not-disturb (no confirmation query)
    pub fn set_do_not_disturb(&self, zone: ZoneNumber, enabled: bool) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetDoNotDisturb(enabled))
    }

    /// Enable or disable dynamic range control (no confirmation query)
    pub fn set_dynamic_range_control(&self, zone: ZoneNumber, enabled: bool) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetDynamicRangeControl(enabled))
    }

    /// Enable or disable loudness (no confirmation query)
    pub fn set_loudness(&self, zone: ZoneNumber, enabled: bool) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetLoudness(enabled))
    }

    /// Enable or disable whole-house mode (no confirmation query)
    pub fn set_whole_house_mode(&self, zone: ZoneNumber, enabled: bool) -> Result<()> {
        self.send_zone_command(zone, ZoneCommand::SetWholeHouseMode(enabled))
    }

    /// Run one full status pass: device status request, then every zone's
    /// queries subject to the firmware gate
    pub fn refresh(&self) -> Result<()> {
        let state = self.state();
        tracing::debug!("Updating device status");
        self.send_all(&state.refresh_frames())?;
        tracing::debug!("Finished updating zones");
        Ok(())
    }
}

impl Refresh for Hub {
    fn refresh(&self) -> Result<()> {
        Hub::refresh(self)
    }
}
