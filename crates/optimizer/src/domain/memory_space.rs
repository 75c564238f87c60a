#![forbid(unsafe_code)]

/// The finite, ascending set of memory sizes (MB) the provider accepts,
/// optionally restricted by user bounds and shrunk from below when the
/// function runs out of memory at its floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySpace {
    memories: Vec<u32>,
}

/// AWS Lambda accepts every integer MB value in this inclusive range.
pub const AWS_MEMORY_RANGE: (u32, u32) = (128, 3008);

impl MemorySpace {
    /// The provider default space, intersected with inclusive `[lo, hi]`
    /// bounds when given.
    pub fn aws_default(bounds: Option<[u32; 2]>) -> Self {
        let (mut lo, mut hi) = AWS_MEMORY_RANGE;
        if let Some([user_lo, user_hi]) = bounds {
            lo = lo.max(user_lo);
            hi = hi.min(user_hi);
        }
        Self {
            memories: (lo..=hi).collect(),
        }
    }

    pub fn from_memories(memories: Vec<u32>) -> Self {
        debug_assert!(memories.is_sorted());
        Self { memories }
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    pub fn first(&self) -> Option<u32> {
        self.memories.first().copied()
    }

    pub fn last(&self) -> Option<u32> {
        self.memories.last().copied()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.memories.get(index).copied()
    }

    pub fn contains(&self, memory_mb: u32) -> bool {
        self.memories.binary_search(&memory_mb).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.memories.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.memories
    }

    /// Drop every memory below `min_memory_mb`.
    pub fn raise_floor(&mut self, min_memory_mb: u32) {
        self.memories.retain(|&m| m >= min_memory_mb);
    }
}
