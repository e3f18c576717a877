use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::protocol::{LogCategory, LogEntry, Tick};

/// Ordered, capped game log. Oldest entries fall off the front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Total entries ever pushed, evicted ones included.
    #[serde(default)]
    written: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
            written: 0,
        }
    }

    pub fn push(&mut self, tick: Tick, at: f64, category: LogCategory, text: String) -> LogEntry {
        let entry = LogEntry {
            tick,
            at,
            text,
            category,
        };
        self.entries.push_back(entry.clone());
        self.written += 1;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        entry
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Entries pushed after `mark` (a previous `written()` value) that are
    /// still retained.
    pub fn since(&self, mark: u64) -> impl Iterator<Item = &LogEntry> {
        let fresh = (self.written.saturating_sub(mark) as usize).min(self.entries.len());
        self.entries.iter().skip(self.entries.len() - fresh)
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries whose text contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.entries.iter().filter(|e| e.text.contains(needle)).count()
    }
}

/// Last-fired timestamps for rate-limited messages, keyed by name and
/// compared against the simulation clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cooldowns {
    last_fired: BTreeMap<String, f64>,
}

impl Cooldowns {
    /// Returns `true` (and records `now`) if `key` has not fired within
    /// the last `cooldown` seconds.
    pub fn ready(&mut self, key: &str, now: f64, cooldown: f64) -> bool {
        match self.last_fired.get(key) {
            Some(&last) if now - last < cooldown => false,
            _ => {
                self.last_fired.insert(key.to_string(), now);
                true
            }
        }
    }

    pub fn forget(&mut self, key: &str) {
        self.last_fired.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_evicts_oldest_past_capacity() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.push(i, i as f64, LogCategory::System, format!("entry {}", i));
        }
        assert_eq!(log.len(), 3);
        let texts: Vec<&str> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["entry 2", "entry 3", "entry 4"]);
        assert_eq!(log.latest().unwrap().text, "entry 4");
    }

    #[test]
    fn since_skips_seen_and_evicted_entries() {
        let mut log = EventLog::new(3);
        log.push(0, 0.0, LogCategory::System, "a".into());
        let mark = log.written();
        for t in ["b", "c", "d", "e"] {
            log.push(1, 1.0, LogCategory::System, t.into());
        }
        let fresh: Vec<&str> = log.since(mark).map(|e| e.text.as_str()).collect();
        assert_eq!(fresh, vec!["c", "d", "e"]);
        assert_eq!(log.since(log.written()).count(), 0);
    }

    #[test]
    fn cooldown_suppresses_until_window_passes() {
        let mut cd = Cooldowns::default();
        assert!(cd.ready("stall", 0.0, 10.0));
        assert!(!cd.ready("stall", 4.0, 10.0));
        assert!(!cd.ready("stall", 9.99, 10.0));
        assert!(cd.ready("stall", 10.0, 10.0));
        // Independent keys don't interfere.
        assert!(cd.ready("topup", 10.5, 10.0));
    }
}
