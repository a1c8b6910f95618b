use std::collections::VecDeque;

//bounded history with freshness bias: a full buffer drops its oldest entry
#[derive(Debug)]
pub struct History<T>{
    entries: VecDeque<(u64, T)>,
    epoch: u64,
    capacity: usize,
}

impl<T: Clone> History<T>{
    pub fn new(capacity: usize) -> Self{
        assert!(capacity > 0, "history capacity must be non-zero");

        History{
            entries: VecDeque::with_capacity(capacity),
            epoch: 0,
            capacity,
        }
    }

    //push and return the epoch assigned to the item
    pub fn push(&mut self, item: T) -> u64{
        if self.entries.len() == self.capacity{
            self.entries.pop_front();
        }

        self.epoch += 1;
        self.entries.push_back((self.epoch, item));
        self.epoch
    }

    pub fn latest(&self) -> Option<(T, u64)>{
        self.entries.back().map(|(epoch, item)| (item.clone(), *epoch))
    }

    //oldest retained entry strictly newer than `epoch`
    pub fn next_after(&self, epoch: u64) -> Option<(T, u64)>{
        self.entries
            .iter()
            .find(|(e, _)| *e > epoch)
            .map(|(e, item)| (item.clone(), *e))
    }

    pub fn latest_epoch(&self) -> u64{
        self.epoch
    }

    pub fn len(&self) -> usize{
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool{
        self.entries.is_empty()
    }
}
