//! Block model, variadic container shapes and drag/connection resolution for
//! the py2blocks editor.
//!
//! The crate is a library with a narrow interface to a canvas host:
//!
//! - [`Workspace`] is the block graph: creation and disposal, connections,
//!   proximity queries, positions, events and deferred tasks.
//! - [`variadic`] grows and shrinks container blocks (lists, tuples, sets,
//!   dicts, `del`, call arguments, comprehensions) and persists their shape.
//! - [`DragStrategy`] runs one drag gesture at a time: detach on start,
//!   candidate search each tick, connect or drop on end, revert on cancel.
//! - Anything visual is requested through [`RenderHost`].
//!
//! ```
//! use py2blocks_core::{variadic, BlockRegistry, ControlAction, EditorConfig, Workspace};
//!
//! let mut ws = Workspace::new(EditorConfig::default(), BlockRegistry::builtin()).unwrap();
//! let list = ws.new_block("List").unwrap();
//! variadic::press_control(&mut ws, list, ControlAction::Add).unwrap();
//! variadic::press_control(&mut ws, list, ControlAction::Add).unwrap();
//! assert_eq!(variadic::save_extra_state(&ws, list).unwrap()["items"], 2);
//! ```

pub mod block;
pub mod config;
pub mod drag;
pub mod duplicate;
pub mod error;
pub mod events;
pub mod geometry;
pub mod host;
pub mod ids;
pub mod procedures;
pub mod schema;
pub mod state;
pub mod tasks;
pub mod variadic;
pub mod workspace;

pub use block::{Block, Connection, ConnectionType, ControlAction, Field, Input, InputKind};
pub use config::{EditorConfig, GridOptions};
pub use drag::{
    prefers_held, should_duplicate, ConnectionCandidate, DragOutcome, DragPhase, DragSession,
    DragStrategy,
};
pub use duplicate::{DuplicateOnDragRules, DuplicateRule};
pub use error::{EditorError, EditorResult};
pub use events::{BlockEvent, EventLog, RecordedEvent, DEFAULT_EVENT_CAPACITY};
pub use geometry::{Coordinate, Rect};
pub use host::{HostCommand, RecordingHost, RenderHost};
pub use ids::{BlockId, ConnectionId};
pub use procedures::ProcedureRegistry;
pub use schema::{BlockDefinition, BlockRegistry, ContainerKind, ContainerSpec};
pub use state::{BlockState, InputState};
pub use tasks::{DeferredAction, TaskQueue};
pub use workspace::{Workspace, CALL_NAME_FIELD};
