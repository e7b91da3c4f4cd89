//! Bounded in-memory log of recent delivery outcomes.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::webhooks::delivery::DeliveryRecord;

#[derive(Debug)]
pub struct DeliveryLog {
    capacity: usize,
    entries: Mutex<VecDeque<DeliveryRecord>>,
}

impl DeliveryLog {
    /// A capacity of zero disables the log.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a record, evicting the oldest once full.
    pub fn record(&self, record: DeliveryRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// Recorded outcomes, newest first.
    pub fn recent(&self) -> Vec<DeliveryRecord> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(event: &str) -> DeliveryRecord {
        DeliveryRecord {
            subscription_id: "wh_1_test".to_string(),
            url: "https://example.com/hook".to_string(),
            event: event.to_string(),
            success: true,
            status_code: Some(200),
            error: None,
            attempts: 1,
            duration_ms: 3,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let log = DeliveryLog::new(2);
        log.record(record("shipment.created"));
        log.record(record("booking.created"));
        log.record(record("invoice.paid"));

        let recent = log.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event, "invoice.paid");
        assert_eq!(recent[1].event, "booking.created");
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let log = DeliveryLog::new(0);
        log.record(record("shipment.created"));
        assert!(log.is_empty());
    }
}
