use std::ops::Range;
use std::time::Duration;

/// The slice of the global sequence one invocation will attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub start_offset: usize,
    pub item_count: usize,
    pub estimated_duration: Duration,
}

impl ChunkPlan {
    /// Offset the next invocation should resume from
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.item_count
    }

    pub fn range(&self) -> Range<usize> {
        self.start_offset..self.end_offset()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_and_end_offset() {
        let plan = ChunkPlan {
            start_offset: 120,
            item_count: 80,
            estimated_duration: Duration::from_secs(480),
        };
        assert_eq!(plan.end_offset(), 200);
        assert_eq!(plan.range(), 120..200);
        assert!(!plan.is_empty());
    }
}
