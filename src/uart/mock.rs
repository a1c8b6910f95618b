//! In-memory transport for tests and hardware-free runs

use std::collections::VecDeque;
use std::sync::Arc;
use parking_lot::Mutex;
use super::Transport;
use crate::error::Result;

/// Clones share the same queues, so a test can keep one handle and feed
/// bytes while the client owns the other.
#[derive(Clone, Default)]
pub struct MockTransport{
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Default)]
struct MockInner{
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl MockTransport{
    pub fn new() -> Self{
        Self::default()
    }

    /// Queue bytes as if the microcontroller had sent them
    pub fn inject_read(&self, data: &[u8]){
        self.inner.lock().rx.extend(data);
    }

    pub fn written(&self) -> Vec<u8>{
        self.inner.lock().tx.clone()
    }

    pub fn pending_read(&self) -> usize{
        self.inner.lock().rx.len()
    }
}

impl Transport for MockTransport{
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>{
        let mut inner = self.inner.lock();
        let n = inner.rx.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.rx.drain(..n)){
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()>{
        self.inner.lock().tx.extend_from_slice(data);
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()>{
        self.inner.lock().rx.clear();
        Ok(())
    }
}
