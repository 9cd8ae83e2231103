//! Dispatch tracking
//!
//! Records every event the session dispatches, whether or not the host had
//! a callback subscribed for it. Used for:
//! - QA of creatives (what did the ad actually emit, and in which order)
//! - Reconciling host-side impression counts

use crate::types::{AdEvent, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// One dispatched event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Unique record ID
    pub id: Uuid,
    /// Session ID
    pub session_id: SessionId,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number, starting at 1
    pub sequence: u64,
    /// The event
    pub event: AdEvent,
    /// Whether a host callback was subscribed at dispatch time
    pub subscribed: bool,
}

/// Bounded log of dispatched events
#[derive(Debug, Clone)]
pub struct TrackingLog {
    session_id: SessionId,
    sequence: u64,
    capacity: usize,
    records: VecDeque<TrackingRecord>,
}

impl TrackingLog {
    pub fn new(session_id: SessionId, capacity: usize) -> Self {
        Self {
            session_id,
            sequence: 0,
            capacity: capacity.max(1),
            records: VecDeque::new(),
        }
    }

    /// Append a record, dropping the oldest once at capacity
    pub fn record(&mut self, event: AdEvent, subscribed: bool) -> &TrackingRecord {
        self.sequence += 1;

        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(TrackingRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            timestamp: Utc::now(),
            sequence: self.sequence,
            event,
            subscribed,
        });

        &self.records[self.records.len() - 1]
    }

    /// All retained records, oldest first
    pub fn records(&self) -> Vec<TrackingRecord> {
        self.records.iter().cloned().collect()
    }

    /// Retained events in dispatch order
    pub fn events(&self) -> Vec<AdEvent> {
        self.records.iter().map(|r| r.event).collect()
    }

    /// How many times `event` was dispatched (within the retained window)
    pub fn count(&self, event: AdEvent) -> usize {
        self.records.iter().filter(|r| r.event == event).count()
    }

    /// Total dispatches, including dropped records
    pub fn total(&self) -> u64 {
        self.sequence
    }
}
