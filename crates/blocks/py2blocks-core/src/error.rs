use thiserror::Error;

use crate::block::ControlAction;
use crate::ids::{BlockId, ConnectionId};

/// Errors produced by workspace, shape and drag operations.
///
/// Malformed persisted state is normalized instead of reported, and "no
/// candidate found" during a drag is an ordinary outcome, so neither has a
/// variant here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditorError {
    #[error("unknown block {0}")]
    UnknownBlock(BlockId),
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    #[error("unknown block type '{0}'")]
    UnknownBlockType(String),
    #[error("block {block} has no input named '{name}'")]
    UnknownInput { block: BlockId, name: String },
    #[error("block {0} is not a variadic container")]
    NotVariadic(BlockId),
    #[error("block {block} has no connection of the kind needed to attach to {target}")]
    MissingConnection { block: BlockId, target: ConnectionId },
    #[error("connections {0} and {1} are not compatible")]
    IncompatibleConnection(ConnectionId, ConnectionId),
    #[error("tried to drag shadow {0} with no parent; shadow blocks should always have parents")]
    ShadowWithoutParent(BlockId),
    #[error("block {0} is not movable")]
    NotMovable(BlockId),
    #[error("a drag of {0} is already in progress")]
    DragInProgress(BlockId),
    #[error("no drag in progress")]
    NoActiveDrag,
    #[error("control '{action}' is not available on {block}")]
    ControlUnavailable {
        block: BlockId,
        action: ControlAction,
    },
    #[error("location ({x}, {y}) is not finite")]
    NonFiniteLocation { x: f64, y: f64 },
    #[error("invalid editor config: {0}")]
    InvalidConfig(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
