/**
 * Serial Handshake Client
 *
 * Owns the link to the actuator microcontroller. Requests are single bytes
 * written without waiting; acknowledgements are awaited with a bounded
 * poll. A link that failed to open stays failed for the life of the
 * process and every call on it returns immediately.
 */

use std::thread;
use std::time::{Duration, Instant};
use parking_lot::Mutex;

use super::{Ack, Command, SerialTransport, Transport};
use crate::config::SerialConfig;
use crate::error::{Error, Result};

enum Link{
    Open(Box<dyn Transport>),
    Failed(String),
}

pub struct HandshakeClient{
    link: Mutex<Link>,
    poll_interval: Duration,
}

impl HandshakeClient{
    /// Open the configured serial device, best-effort
    ///
    /// An unopenable port yields a client in the Failed state instead of an
    /// error so startup continues and teleop stays usable.
    pub fn open(config: &SerialConfig) -> Self{
        match SerialTransport::open(&config.device, config.baud_rate){
            Ok(transport) => Self::with_transport(Box::new(transport), config.poll_interval()),
            Err(e) =>{
                log::warn!(
                    "Actuator link {} unavailable, autonomous digging disabled: {}",
                    config.device,
                    e
                );
                Self::failed(e.to_string())
            }
        }
    }

    pub fn with_transport(transport: Box<dyn Transport>, poll_interval: Duration) -> Self{
        Self{
            link: Mutex::new(Link::Open(transport)),
            poll_interval,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self{
        Self{
            link: Mutex::new(Link::Failed(reason.into())),
            poll_interval: Duration::ZERO,
        }
    }

    pub fn is_available(&self) -> bool{
        matches!(*self.link.lock(), Link::Open(_))
    }

    /// Write one request byte without waiting for its acknowledgement
    pub fn send(&self, cmd: Command) -> Result<()>{
        let mut link = self.link.lock();
        let transport = open_transport(&mut link)?;
        transport.write_all(&[cmd.as_byte()])?;
        log::debug!("Sent {:?}", cmd);
        Ok(())
    }

    /// Drop stale bytes left over from a previous exchange
    pub fn flush_input(&self) -> Result<()>{
        let mut link = self.link.lock();
        open_transport(&mut link)?.clear_input()
    }

    /// Poll incoming bytes until `expected` arrives
    ///
    /// Any other byte is discarded. Fails with `AckTimeout` once `timeout`
    /// elapses and with `Cancelled` as soon as `should_abort` returns true.
    /// The link lock is released between reads.
    pub fn await_ack<F>(&self, expected: Ack, timeout: Duration, should_abort: F) -> Result<()>
    where
        F: Fn() -> bool,
    {
        let start = Instant::now();
        let mut byte = [0u8; 1];

        loop{
            if should_abort(){
                return Err(Error::Cancelled);
            }

            let n = {
                let mut link = self.link.lock();
                open_transport(&mut link)?.read(&mut byte)?
            };

            if n == 1{
                if byte[0] == expected.as_byte(){
                    log::debug!("Received {:?}", expected);
                    return Ok(());
                }
                log::debug!("Discarding byte {:#04x} while waiting for {:?}", byte[0], expected);
            }

            // Checked on every pass so a chattering line still times out
            if start.elapsed() >= timeout{
                return Err(Error::AckTimeout{
                    expected,
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }
            if n == 0{
                thread::sleep(self.poll_interval);
            }
        }
    }

    /// Send `cmd` and wait for its acknowledgement
    pub fn request<F>(&self, cmd: Command, timeout: Duration, should_abort: F) -> Result<()>
    where
        F: Fn() -> bool,
    {
        self.send(cmd)?;
        self.await_ack(cmd.ack(), timeout, should_abort)
    }
}

fn open_transport(link: &mut Link) -> Result<&mut Box<dyn Transport>>{
    match link{
        Link::Open(transport) => Ok(transport),
        Link::Failed(reason) => Err(Error::HardwareUnavailable(reason.clone())),
    }
}
