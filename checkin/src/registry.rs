//! Latest check-in report per address.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::outcome::CheckinReport;

/// Stores the latest report per address. Last write wins.
pub trait ResultRegistry: Send + Sync {
    /// Records `report` for `address`, replacing any previous one.
    fn record(&self, address: &str, report: CheckinReport);

    /// Returns the latest report for `address`.
    fn lookup(&self, address: &str) -> Option<CheckinReport>;
}

/// In-memory registry.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    reports: Arc<RwLock<HashMap<String, CheckinReport>>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addresses with a report.
    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

impl ResultRegistry for MemoryRegistry {
    fn record(&self, address: &str, report: CheckinReport) {
        self.reports.write().insert(address.to_string(), report);
    }

    fn lookup(&self, address: &str) -> Option<CheckinReport> {
        self.reports.read().get(address).cloned()
    }
}
