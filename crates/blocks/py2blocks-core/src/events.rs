//! Workspace event log with undo grouping.
//!
//! Events fired while a group is open share its id, so an undo stack can treat
//! a whole drag gesture as one unit.
//!
//! Nothing in the library consumes the log. Hosts drain it with
//! [`EventLog::drain`] after each operation; a log that is never drained keeps
//! only the most recent [`EventLog::capacity`] events.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Coordinate;
use crate::ids::{BlockId, ConnectionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockEvent {
    Create {
        block: BlockId,
        type_name: String,
    },
    Delete {
        block: BlockId,
    },
    Drag {
        block: BlockId,
        is_start: bool,
        descendants: Vec<BlockId>,
    },
    Move {
        block: BlockId,
        old_xy: Coordinate,
        new_xy: Coordinate,
        reason: String,
    },
    Connect {
        parent: ConnectionId,
        child: BlockId,
    },
    Disconnect {
        parent: ConnectionId,
        child: BlockId,
    },
    Mutation {
        block: BlockId,
        old_items: usize,
        new_items: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub group: Option<String>,
    pub event: BlockEvent,
}

/// Events kept by a log nobody drains.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<RecordedEvent>,
    group: Option<String>,
    capacity: usize,
    dropped: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            group: None,
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events discarded because the log was full, since the last drain.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Open a fresh group (`true`) or close the current one (`false`).
    pub fn set_group(&mut self, open: bool) {
        self.group = open.then(|| Uuid::new_v4().to_string());
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn fire(&mut self, event: BlockEvent) {
        log::trace!("event {:?} (group {:?})", event, self.group);
        if self.events.len() == self.capacity {
            if self.dropped == 0 {
                log::warn!(
                    "event log full ({} events); dropping the oldest until drained",
                    self.capacity
                );
            }
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(RecordedEvent {
            group: self.group.clone(),
            event,
        });
    }

    pub fn events(&self) -> &VecDeque<RecordedEvent> {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<RecordedEvent> {
        self.dropped = 0;
        self.events.drain(..).collect()
    }

    pub fn in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a BlockEvent> + 'a {
        self.events
            .iter()
            .filter(move |e| e.group.as_deref() == Some(group))
            .map(|e| &e.event)
    }

    /// Id of the most recent group that recorded any event.
    pub fn last_group(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| e.group.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_events_share_an_id() {
        let mut log = EventLog::new();
        log.fire(BlockEvent::Delete { block: BlockId(9) });
        log.set_group(true);
        let gid = log.group().expect("group open").to_string();
        log.fire(BlockEvent::Delete { block: BlockId(1) });
        log.fire(BlockEvent::Delete { block: BlockId(2) });
        log.set_group(false);
        log.fire(BlockEvent::Delete { block: BlockId(3) });

        assert_eq!(log.in_group(&gid).count(), 2);
        assert_eq!(log.last_group(), Some(gid.as_str()));
        assert_eq!(log.events()[0].group, None);
        assert_eq!(log.drain().len(), 4);
        assert!(log.events().is_empty());
    }

    #[test]
    fn full_log_keeps_the_newest_events() {
        let mut log = EventLog::with_capacity(3);
        for i in 0..5 {
            log.fire(BlockEvent::Delete { block: BlockId(i) });
        }
        assert_eq!(log.events().len(), 3);
        assert_eq!(log.dropped(), 2);
        assert_eq!(
            log.events().front().map(|e| &e.event),
            Some(&BlockEvent::Delete { block: BlockId(2) })
        );
        assert_eq!(log.drain().len(), 3);
        assert_eq!(log.dropped(), 0);
    }

    #[test]
    fn reopening_creates_a_new_group() {
        let mut log = EventLog::new();
        log.set_group(true);
        let first = log.group().map(str::to_string);
        log.set_group(true);
        assert_ne!(first.as_deref(), log.group());
    }
}
