//! Rising-edge detection over button snapshots

/// Button indices that went from released to pressed in one input cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RisingEdges{
    indices: Vec<usize>,
}

impl RisingEdges{
    pub fn contains(&self, index: usize) -> bool{
        self.indices.contains(&index)
    }

    pub fn is_empty(&self) -> bool{
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_{
        self.indices.iter().copied()
    }
}

/// Keeps the previous button snapshot
///
/// `rising` only reads; `commit` stores the snapshot. Callers dispatch every
/// edge consumer between the two so all of them see the same edge set.
#[derive(Debug, Default)]
pub struct EdgeDetector{
    previous: Vec<bool>,
}

impl EdgeDetector{
    pub fn new() -> Self{
        Self::default()
    }

    pub fn rising(&self, current: &[bool]) -> RisingEdges{
        let indices = current
            .iter()
            .enumerate()
            .filter(|&(i, &pressed)| pressed && !self.previous.get(i).copied().unwrap_or(false))
            .map(|(i, _)| i)
            .collect();
        RisingEdges{ indices }
    }

    pub fn commit(&mut self, current: &[bool]){
        self.previous.clear();
        self.previous.extend_from_slice(current);
    }
}
