#![forbid(unsafe_code)]

/// One observed invocation: billed duration at a memory configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPoint {
    pub memory_mb: u32,
    pub duration_ms: u64,
}

/// The accumulated observations of a run, kept sorted by memory.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    points: Vec<DataPoint>,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, point: DataPoint) {
        self.points.push(point);
        self.points.sort_by_key(|p| p.memory_mb);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Memory of every data point, duplicates included, ascending.
    pub fn memories(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.memory_mb).collect()
    }

    /// Distinct memories sampled so far, ascending.
    pub fn distinct_memories(&self) -> Vec<u32> {
        let mut memories = self.memories();
        memories.dedup();
        memories
    }

    pub fn durations(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.duration_ms).collect()
    }

    /// Per-point cost proxy: memory times billed duration. This is what the
    /// parametric model is fitted against.
    pub fn costs(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| f64::from(p.memory_mb) * p.duration_ms as f64)
            .collect()
    }

    pub fn contains_memory(&self, memory_mb: u32) -> bool {
        self.points.iter().any(|p| p.memory_mb == memory_mb)
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(memory_mb: u32, duration_ms: u64) -> DataPoint {
        DataPoint {
            memory_mb,
            duration_ms,
        }
    }

    #[test]
    fn insert_keeps_points_sorted_by_memory() {
        let mut sample = Sample::new();
        sample.insert(point(1024, 400));
        sample.insert(point(128, 3000));
        sample.insert(point(512, 800));
        assert_eq!(sample.memories(), vec![128, 512, 1024]);
    }

    #[test]
    fn distinct_memories_deduplicates() {
        let mut sample = Sample::new();
        sample.insert(point(128, 3000));
        sample.insert(point(128, 2900));
        sample.insert(point(512, 800));
        assert_eq!(sample.distinct_memories(), vec![128, 512]);
        assert_eq!(sample.len(), 3);
    }

    #[test]
    fn costs_weight_durations_by_memory() {
        let mut sample = Sample::new();
        sample.insert(point(256, 1000));
        assert_eq!(sample.costs(), vec![256_000.0]);
    }
}
