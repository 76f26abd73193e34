use crate::error::Result;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

/// Open the hub's RS-232 port: `baud_rate` baud, 8 data bits, no parity,
/// one stop bit, no flow control
pub fn open_serial(port: &str, baud_rate: u32) -> Result<SerialStream> {
    tracing::info!("Opening serial port {} at {} baud", port, baud_rate);

    let stream = tokio_serial::new(port, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()?;

    Ok(stream)
}
