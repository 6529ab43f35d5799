//! Render-side de-duplication of message records.
//!
//! After a reconnect the same record can arrive twice: once through the
//! history request and once through the server's backlog on the WebSocket.

use std::collections::{HashSet, VecDeque};

/// Number of ids remembered before the oldest are forgotten
const MAX_TRACKED_IDS: usize = 1_000;

/// Set of message ids that have already been rendered
#[derive(Debug, Default)]
pub struct Timeline {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record should be rendered.
    ///
    /// Records without an id are always rendered; a known id is rendered only once.
    pub fn admit(&mut self, id: Option<&str>) -> bool {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return true;
        };
        if !self.seen.insert(id.to_string()) {
            return false;
        }

        self.order.push_back(id.to_string());
        if self.order.len() > MAX_TRACKED_IDS
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
