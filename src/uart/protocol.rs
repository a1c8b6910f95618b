//! Single-byte request/acknowledge alphabet shared with the actuator board

/// Requests sent to the microcontroller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command{
    /// Extend the digger linear actuator
    Extend = b'e',
    /// Retract the digger linear actuator
    Retract = b'r',
}

/// Acknowledgements the microcontroller sends once a request finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Ack{
    ExtendDone = b'f',
    RetractDone = b's',
}

impl Command{
    pub fn as_byte(self) -> u8{
        self as u8
    }

    /// Acknowledgement that confirms this request
    pub fn ack(self) -> Ack{
        match self{
            Command::Extend => Ack::ExtendDone,
            Command::Retract => Ack::RetractDone,
        }
    }
}

impl Ack{
    pub fn as_byte(self) -> u8{
        self as u8
    }

    pub fn from_u8(val: u8) -> Option<Self>{
        match val{
            b'f' => Some(Ack::ExtendDone),
            b's' => Some(Ack::RetractDone),
            _ => None,
        }
    }
}
