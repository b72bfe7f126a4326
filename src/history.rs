//! Roll history
//!
//! Persisted to LocalStorage, keeps the most recent rolls plus running
//! per-label tallies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::HISTORY_CAPACITY;
use crate::sim::{ObjectKind, Outcome, RollRecord};

/// Recent rolls, newest first, with tallies over everything recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryLedger {
    pub entries: Vec<RollRecord>,
    /// Count per outcome label ("1".."6", "heads", "tails")
    pub tallies: BTreeMap<String, u32>,
    /// Rolls recorded since the last reset, including ones trimmed from `entries`
    pub total_rolls: u32,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    HISTORY_CAPACITY
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLedger {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "fair_toss_history";

    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            tallies: BTreeMap::new(),
            total_rolls: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound, dropping the oldest entries if needed
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.entries.truncate(self.capacity);
    }

    /// Record a bare list of outcomes from one toss.
    /// Returns None when there is nothing to record.
    pub fn record(&mut self, outcomes: &[Outcome], timestamp: f64) -> Option<&RollRecord> {
        let kind = match outcomes.first()? {
            Outcome::Face(_) => ObjectKind::Die,
            Outcome::Heads | Outcome::Tails => ObjectKind::Coin,
        };
        self.record_roll(RollRecord::new(kind, outcomes.to_vec(), timestamp, false))
    }

    /// Record a settled toss
    pub fn record_roll(&mut self, record: RollRecord) -> Option<&RollRecord> {
        if record.outcomes.is_empty() {
            return None;
        }
        for outcome in &record.outcomes {
            *self.tallies.entry(outcome.label()).or_insert(0) += 1;
        }
        self.total_rolls += 1;

        self.entries.insert(0, record);
        self.entries.truncate(self.capacity);
        self.entries.first()
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.entries.clear();
        self.tallies.clear();
        self.total_rolls = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&RollRecord> {
        self.entries.first()
    }

    pub fn tally(&self, outcome: Outcome) -> u32 {
        self.tallies.get(&outcome.label()).copied().unwrap_or(0)
    }

    /// Load history from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(history) = serde_json::from_str::<HistoryLedger>(&json) {
                    log::info!("Loaded {} history entries", history.entries.len());
                    return history;
                }
            }
        }

        log::info!("No history found, starting fresh");
        Self::new()
    }

    /// Save history to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::debug!("History saved ({} entries)", self.entries.len());
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// One-line summary, e.g. "3 + 5 = 8" or "heads, tails"
pub fn format_record(record: &RollRecord) -> String {
    let labels: Vec<String> = record.outcomes.iter().map(Outcome::label).collect();
    match record.total {
        Some(total) if labels.len() > 1 => format!("{} = {}", labels.join(" + "), total),
        _ => labels.join(", "),
    }
}

/// Format a timestamp as a relative time string
#[cfg(target_arch = "wasm32")]
pub fn format_time(timestamp: f64) -> String {
    let diff_secs = (js_sys::Date::now() - timestamp) / 1000.0;
    let diff_mins = diff_secs / 60.0;
    let diff_hours = diff_mins / 60.0;

    if diff_hours >= 24.0 {
        let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(timestamp));
        format!(
            "{}/{}/{}",
            date.get_month() + 1,
            date.get_date(),
            date.get_full_year() % 100
        )
    } else if diff_hours >= 1.0 {
        format!("{}h ago", diff_hours.floor() as i32)
    } else if diff_mins >= 1.0 {
        format!("{}m ago", diff_mins.floor() as i32)
    } else {
        "Just now".to_string()
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn format_time(timestamp: f64) -> String {
    format!("t+{:.1}s", timestamp / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dice(faces: &[u8]) -> Vec<Outcome> {
        faces.iter().map(|&f| Outcome::Face(f)).collect()
    }

    #[test]
    fn test_record_derives_kind_and_total() {
        let mut ledger = HistoryLedger::new();
        let record = ledger.record(&dice(&[3, 5]), 10.0).unwrap();
        assert_eq!(record.kind, ObjectKind::Die);
        assert_eq!(record.total, Some(8));

        let record = ledger.record(&[Outcome::Heads], 20.0).unwrap();
        assert_eq!(record.kind, ObjectKind::Coin);
        assert_eq!(record.total, None);

        assert!(ledger.record(&[], 30.0).is_none());
        assert_eq!(ledger.total_rolls, 2);
    }

    #[test]
    fn test_entries_are_bounded_newest_first() {
        let mut ledger = HistoryLedger::new();
        for i in 0..15 {
            ledger.record(&dice(&[(i % 6) as u8 + 1]), i as f64);
        }
        assert_eq!(ledger.entries.len(), HISTORY_CAPACITY);
        assert_eq!(ledger.latest().unwrap().timestamp, 14.0);
        assert_eq!(ledger.entries.last().unwrap().timestamp, 5.0);
        // tallies cover trimmed entries too
        assert_eq!(ledger.total_rolls, 15);
        let counted: u32 = ledger.tallies.values().sum();
        assert_eq!(counted, 15);
    }

    #[test]
    fn test_tallies_per_label() {
        let mut ledger = HistoryLedger::new();
        ledger.record(&dice(&[6, 6, 1]), 0.0);
        ledger.record(&[Outcome::Tails], 1.0);
        assert_eq!(ledger.tally(Outcome::Face(6)), 2);
        assert_eq!(ledger.tally(Outcome::Face(1)), 1);
        assert_eq!(ledger.tally(Outcome::Tails), 1);
        assert_eq!(ledger.tally(Outcome::Heads), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ledger = HistoryLedger::new();
        ledger.record(&dice(&[2]), 0.0);
        ledger.reset();
        assert!(ledger.is_empty());
        assert!(ledger.tallies.is_empty());
        assert_eq!(ledger.total_rolls, 0);
    }

    #[test]
    fn test_shrinking_capacity_drops_oldest() {
        let mut ledger = HistoryLedger::with_capacity(5);
        for i in 0..5 {
            ledger.record(&[Outcome::Heads], i as f64);
        }
        ledger.set_capacity(2);
        assert_eq!(ledger.entries.len(), 2);
        assert_eq!(ledger.entries[1].timestamp, 3.0);
    }

    #[test]
    fn test_history_round_trips_through_json() {
        let mut ledger = HistoryLedger::with_capacity(4);
        ledger.record(&dice(&[4, 2]), 1.0);
        let json = serde_json::to_string(&ledger).unwrap();
        let back: HistoryLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries, ledger.entries);
        assert_eq!(back.capacity(), 4);
        assert_eq!(back.tally(Outcome::Face(4)), 1);
    }

    #[test]
    fn test_format_record() {
        let mut ledger = HistoryLedger::new();
        let two = ledger.record(&dice(&[3, 5]), 0.0).unwrap().clone();
        assert_eq!(format_record(&two), "3 + 5 = 8");
        let one = ledger.record(&dice(&[4]), 0.0).unwrap().clone();
        assert_eq!(format_record(&one), "4");
        let coins = ledger.record(&[Outcome::Heads, Outcome::Tails], 0.0).unwrap().clone();
        assert_eq!(format_record(&coins), "heads, tails");
    }
}
