pub mod protocol;
pub mod handshake;
pub mod mock;

pub use protocol::*;
pub use handshake::HandshakeClient;
pub use mock::MockTransport;

use std::io::{Read, Write};
use std::time::Duration;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use crate::error::Result;

//read timeout of the port itself; the handshake client adds its own poll sleep
const READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Byte stream to the actuator microcontroller
pub trait Transport: Send{
    /// Read available bytes into `buffer`, returns 0 when nothing arrived
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Discard everything received but not yet read
    fn clear_input(&mut self) -> Result<()>;
}

pub struct SerialTransport{
    port: Box<dyn SerialPort>,
}

impl SerialTransport{
    pub fn open(path: &str, baud_rate: u32) -> Result<Self>{
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        log::info!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(SerialTransport{ port })
    }
}

impl Transport for SerialTransport{
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>{
        match self.port.read(buffer){
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()>{
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()>{
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}
