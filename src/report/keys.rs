use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

/// Occurrence counts of tag keys no rule set recognized.
#[derive(Debug, Default)]
pub struct KeyFrequencyTable {
    counts: HashMap<String, u64>,
}

impl KeyFrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unknown_keys(&mut self, keys: &[String]) {
        for key in keys {
            *self.counts.entry(key.clone()).or_insert(0) += 1;
        }
    }

    #[cfg(test)]
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn distinct_keys(&self) -> usize {
        self.counts.len()
    }

    /// Keys counted more than `min_count` times, most frequent first.
    /// Equal counts are ordered by key.
    pub fn top_keys(&self, min_count: u64) -> Vec<KeyCount> {
        let mut keys: Vec<KeyCount> = self
            .counts
            .iter()
            .filter(|(_, count)| **count > min_count)
            .map(|(key, count)| KeyCount {
                key: key.clone(),
                count: *count,
            })
            .collect();

        keys.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        keys
    }
}
