//! Ordered, deduplicated list of links offered so far

use tracing::debug;

use super::LinkRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRegistry {
    records: Vec<LinkRecord>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<LinkRecord>) -> Self {
        Self { records }
    }

    /// Whether a record matches (see [`LinkRecord::matches`])
    pub fn exists(&self, display_name: Option<&str>, url: Option<&str>) -> bool {
        self.records.iter().any(|r| r.matches(display_name, url))
    }

    /// Insert a record. `absolute_position` is 1-based; `None`, zero, or a
    /// position past the end appends.
    pub fn insert(&mut self, record: LinkRecord, absolute_position: Option<usize>) {
        match absolute_position {
            Some(position) if position > 0 && position <= self.records.len() => {
                self.records.insert(position - 1, record);
            }
            _ => self.records.push(record),
        }
    }

    /// Remove every record whose display name or URL equals `key`.
    /// Returns how many were removed.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.records.len();
        self.records
            .retain(|r| r.display_name.as_deref() != Some(key) && r.url.as_deref() != Some(key));
        let removed = before - self.records.len();
        debug!(key, removed, "Removed links");
        removed
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Swap in a loaded snapshot
    pub fn replace(&mut self, records: Vec<LinkRecord>) {
        self.records = records;
    }

    pub fn records(&self) -> &[LinkRecord] {
        &self.records
    }

    pub fn to_vec(&self) -> Vec<LinkRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Container names in first-seen order
    pub fn containers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.container.as_str()) {
                seen.push(&record.container);
            }
        }
        seen
    }

    /// Records rendered into `container`, sorted by position. Ties keep
    /// registry order.
    pub fn in_container(&self, container: &str) -> Vec<&LinkRecord> {
        let mut records: Vec<&LinkRecord> = self
            .records
            .iter()
            .filter(|r| r.container == container)
            .collect();
        records.sort_by_key(|r| r.position);
        records
    }
}
