//! Visual side effects requested from the embedding canvas.
//!
//! The library never draws. Everything visual goes through [`RenderHost`];
//! [`RecordingHost`] buffers the calls as [`HostCommand`]s for hosts that poll
//! (the wasm facade) and for tests.

use serde::{Deserialize, Serialize};

use crate::geometry::Coordinate;
use crate::ids::{BlockId, ConnectionId};

pub trait RenderHost {
    /// Show where the dragged block would plug in.
    fn preview_connection(&mut self, local: ConnectionId, neighbour: ConnectionId);

    /// Show that `replaced` would be bumped out by the drop.
    fn preview_replacement(&mut self, local: ConnectionId, neighbour: ConnectionId, replaced: BlockId);

    fn hide_preview(&mut self);

    /// Release the previewer at the end of a gesture.
    fn dispose_preview(&mut self) {}

    /// Translate the dragged block without touching the model.
    fn move_during_drag(&mut self, block: BlockId, location: Coordinate);

    fn connection_effect(&mut self, block: BlockId);

    fn disconnect_effect(&mut self, block: BlockId);

    fn stop_disconnect_effect(&mut self) {}

    fn bring_to_front(&mut self, block: BlockId);

    fn queue_render(&mut self, block: BlockId);

    fn set_text_width_cache(&mut self, enabled: bool) {
        let _ = enabled;
    }

    fn set_resizes_enabled(&mut self, enabled: bool) {
        let _ = enabled;
    }

    fn set_drag_layer(&mut self, block: BlockId, active: bool) {
        let _ = (block, active);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    PreviewConnection {
        local: ConnectionId,
        neighbour: ConnectionId,
    },
    PreviewReplacement {
        local: ConnectionId,
        neighbour: ConnectionId,
        replaced: BlockId,
    },
    HidePreview,
    DisposePreview,
    MoveDuringDrag {
        block: BlockId,
        location: Coordinate,
    },
    ConnectionEffect {
        block: BlockId,
    },
    DisconnectEffect {
        block: BlockId,
    },
    StopDisconnectEffect,
    BringToFront {
        block: BlockId,
    },
    QueueRender {
        block: BlockId,
    },
    TextWidthCache {
        enabled: bool,
    },
    ResizesEnabled {
        enabled: bool,
    },
    DragLayer {
        block: BlockId,
        active: bool,
    },
}

/// Host that records every request in order.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub commands: Vec<HostCommand>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn count(&self, pred: impl Fn(&HostCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    pub fn last(&self) -> Option<&HostCommand> {
        self.commands.last()
    }
}

impl RenderHost for RecordingHost {
    fn preview_connection(&mut self, local: ConnectionId, neighbour: ConnectionId) {
        self.commands
            .push(HostCommand::PreviewConnection { local, neighbour });
    }

    fn preview_replacement(&mut self, local: ConnectionId, neighbour: ConnectionId, replaced: BlockId) {
        self.commands.push(HostCommand::PreviewReplacement {
            local,
            neighbour,
            replaced,
        });
    }

    fn hide_preview(&mut self) {
        self.commands.push(HostCommand::HidePreview);
    }

    fn dispose_preview(&mut self) {
        self.commands.push(HostCommand::DisposePreview);
    }

    fn move_during_drag(&mut self, block: BlockId, location: Coordinate) {
        self.commands
            .push(HostCommand::MoveDuringDrag { block, location });
    }

    fn connection_effect(&mut self, block: BlockId) {
        self.commands.push(HostCommand::ConnectionEffect { block });
    }

    fn disconnect_effect(&mut self, block: BlockId) {
        self.commands.push(HostCommand::DisconnectEffect { block });
    }

    fn stop_disconnect_effect(&mut self) {
        self.commands.push(HostCommand::StopDisconnectEffect);
    }

    fn bring_to_front(&mut self, block: BlockId) {
        self.commands.push(HostCommand::BringToFront { block });
    }

    fn queue_render(&mut self, block: BlockId) {
        self.commands.push(HostCommand::QueueRender { block });
    }

    fn set_text_width_cache(&mut self, enabled: bool) {
        self.commands.push(HostCommand::TextWidthCache { enabled });
    }

    fn set_resizes_enabled(&mut self, enabled: bool) {
        self.commands.push(HostCommand::ResizesEnabled { enabled });
    }

    fn set_drag_layer(&mut self, block: BlockId, active: bool) {
        self.commands.push(HostCommand::DragLayer { block, active });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_serialize_with_tag() {
        let cmd = HostCommand::BringToFront { block: BlockId(4) };
        let json = serde_json::to_value(&cmd).expect("serialize");
        assert_eq!(json["command"], "bring_to_front");
        assert_eq!(json["block"], 4);
    }

    #[test]
    fn recording_host_keeps_order() {
        let mut host = RecordingHost::new();
        host.hide_preview();
        host.queue_render(BlockId(1));
        assert_eq!(host.count(|c| matches!(c, HostCommand::HidePreview)), 1);
        assert_eq!(
            host.last(),
            Some(&HostCommand::QueueRender { block: BlockId(1) })
        );
        assert_eq!(host.drain().len(), 2);
        assert!(host.commands.is_empty());
    }
}
