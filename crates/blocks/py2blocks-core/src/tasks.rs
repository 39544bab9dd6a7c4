//! Deferred continuations.
//!
//! Connection feedback waits for the host to finish pending layout, and
//! raising a block to the top waits one more scheduling turn. Both are queued
//! here and run when the host calls [`Workspace::flush_layout`] and
//! [`Workspace::run_next_tick`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::host::RenderHost;
use crate::ids::BlockId;
use crate::workspace::Workspace;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeferredAction {
    /// Play the connection effect on `inferior`, then raise `root` next tick.
    ConnectionFeedback { inferior: BlockId, root: BlockId },
    BringToFront { block: BlockId },
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    after_layout: VecDeque<DeferredAction>,
    next_tick: VecDeque<DeferredAction>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after_layout(&mut self, action: DeferredAction) {
        self.after_layout.push_back(action);
    }

    pub fn next_tick(&mut self, action: DeferredAction) {
        self.next_tick.push_back(action);
    }

    pub fn pending_after_layout(&self) -> usize {
        self.after_layout.len()
    }

    pub fn pending_next_tick(&self) -> usize {
        self.next_tick.len()
    }

    pub fn is_empty(&self) -> bool {
        self.after_layout.is_empty() && self.next_tick.is_empty()
    }

    pub fn clear(&mut self) {
        self.after_layout.clear();
        self.next_tick.clear();
    }
}

impl Workspace {
    /// Host notification that queued renders finished. Returns how many tasks ran.
    pub fn flush_layout(&mut self, host: &mut dyn RenderHost) -> usize {
        let pending: Vec<DeferredAction> = self.tasks.after_layout.drain(..).collect();
        let mut ran = 0;
        for action in pending {
            if self.run_action(action, host) {
                ran += 1;
            }
        }
        ran
    }

    /// Run everything scheduled for the next turn. Returns how many tasks ran.
    pub fn run_next_tick(&mut self, host: &mut dyn RenderHost) -> usize {
        let pending: Vec<DeferredAction> = self.tasks.next_tick.drain(..).collect();
        let mut ran = 0;
        for action in pending {
            if self.run_action(action, host) {
                ran += 1;
            }
        }
        ran
    }

    fn run_action(&mut self, action: DeferredAction, host: &mut dyn RenderHost) -> bool {
        match action {
            DeferredAction::ConnectionFeedback { inferior, root } => {
                if !self.contains_block(inferior) {
                    log::debug!("skipping connection feedback for disposed {inferior}");
                    return false;
                }
                host.connection_effect(inferior);
                self.tasks
                    .next_tick(DeferredAction::BringToFront { block: root });
                true
            }
            DeferredAction::BringToFront { block } => {
                if !self.contains_block(block) {
                    log::debug!("skipping bring-to-front for disposed {block}");
                    return false;
                }
                host.bring_to_front(block);
                true
            }
        }
    }
}
