use parking_lot::Mutex;
use super::history::History;
use super::Message;

/// Named, thread-safe outbound channel
///
/// Publishing never blocks beyond a short critical section, so the input
/// handler and the periodic publisher can both write without stalling.
pub struct Topic<T: Message>{
    name: String,
    history: Mutex<History<T>>,
}

impl<T: Message> Topic<T>{
    pub fn new(name: &str, capacity: usize) -> Self{
        Topic{
            name: name.to_string(),
            history: Mutex::new(History::new(capacity)),
        }
    }

    pub fn name(&self) -> &str{
        &self.name
    }

    pub fn publish(&self, msg: T) -> u64{
        self.history.lock().push(msg)
    }

    pub fn peek_latest(&self) -> Option<(T, u64)>{
        self.history.lock().latest()
    }

    pub fn next_after(&self, epoch: u64) -> Option<(T, u64)>{
        self.history.lock().next_after(epoch)
    }

    pub fn latest_epoch(&self) -> u64{
        self.history.lock().latest_epoch()
    }

    pub fn len(&self) -> usize{
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool{
        self.history.lock().is_empty()
    }
}
