//! Block drag strategy.
//!
//! # State machine
//!
//! ```text
//!          start_drag            end_drag
//!   Idle ─────────────► Dragging ─────────► Applying ──► Idle
//!                          │ ▲
//!                     drag │ │                revert_drag
//!                          └─┘   Dragging ─────────────► Reverting ──► Idle
//! ```
//!
//! Only `start_drag` (detach) and `end_drag` (connect or drop) change the
//! block graph. `drag` touches preview state and the host's transient
//! translation, nothing else. Every way out of a session, including errors,
//! releases host caches and closes the event group.

mod candidate;

pub use candidate::{prefers_held, ConnectionCandidate};

use serde::{Deserialize, Serialize};

use crate::block::ConnectionType;
use crate::error::{EditorError, EditorResult};
use crate::events::BlockEvent;
use crate::geometry::Coordinate;
use crate::host::RenderHost;
use crate::ids::{BlockId, ConnectionId};
use crate::tasks::DeferredAction;
use crate::workspace::{ensure_finite, Workspace};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Applying,
    Reverting,
}

/// Ephemeral state of one gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub block: BlockId,
    pub start_loc: Coordinate,
    pub current_loc: Coordinate,
    /// Superior end the block was plugged into.
    pub start_parent_conn: Option<ConnectionId>,
    /// Previous end of the block that was stacked below, when healing.
    pub start_child_conn: Option<ConnectionId>,
    pub candidate: Option<ConnectionCandidate>,
    /// Added to incoming locations when the drag was delegated from a placeholder.
    pub drag_offset: Coordinate,
    pub dragging: bool,
    /// Copy left behind in the vacated input.
    pub duplicate: Option<BlockId>,
    pub was_shadow: bool,
    prior_override: Option<bool>,
    /// Socket whose placeholder template was written by this drag.
    stored_template: Option<ConnectionId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DragOutcome {
    Connected {
        block: BlockId,
        candidate: ConnectionCandidate,
    },
    Dropped {
        block: BlockId,
        location: Coordinate,
    },
}

#[derive(Debug, Default)]
pub struct DragStrategy {
    session: Option<DragSession>,
    phase: DragPhase,
}

impl DragStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn candidate(&self) -> Option<ConnectionCandidate> {
        self.session.as_ref().and_then(|s| s.candidate)
    }

    /// A placeholder moves with its parent; anything else must be movable,
    /// alive, outside the flyout, on an editable workspace.
    pub fn is_movable(&self, ws: &Workspace, block: BlockId) -> EditorResult<bool> {
        let Ok(b) = ws.block(block) else {
            return Ok(false);
        };
        if b.shadow {
            return match ws.parent(block)? {
                Some(parent) => self.is_movable(ws, parent),
                None => Ok(false),
            };
        }
        Ok(b.movable && !b.in_flyout && !ws.config().read_only)
    }

    /// Begin a gesture on `block`. Returns the block actually being dragged,
    /// which is the owning ancestor when `block` is a non-draggable placeholder.
    pub fn start_drag(
        &mut self,
        ws: &mut Workspace,
        host: &mut dyn RenderHost,
        block: BlockId,
        heal_stack: bool,
    ) -> EditorResult<BlockId> {
        if let Some(session) = &self.session {
            return Err(EditorError::DragInProgress(session.block));
        }
        let (target, drag_offset) = resolve_drag_target(ws, block)?;
        if !self.is_movable(ws, target)? {
            return Err(EditorError::NotMovable(target));
        }

        if ws.events.group().is_none() {
            ws.events.set_group(true);
        }
        let descendants = ws.descendants(target)?;
        ws.events.fire(BlockEvent::Drag {
            block: target,
            is_start: true,
            descendants,
        });
        let start_loc = ws.block(target)?.xy;
        host.set_text_width_cache(true);
        host.set_resizes_enabled(false);
        host.stop_disconnect_effect();

        let mut session = DragSession {
            block: target,
            start_loc,
            current_loc: start_loc,
            start_parent_conn: None,
            start_child_conn: None,
            candidate: None,
            drag_offset,
            dragging: true,
            duplicate: None,
            was_shadow: false,
            prior_override: None,
            stored_template: None,
        };

        let needs_detach =
            ws.parent(target)?.is_some() || (heal_stack && ws.next_block(target)?.is_some());
        if needs_detach {
            if let Err(err) = detach(ws, host, &mut session, heal_stack) {
                log::warn!("detaching {target} failed: {err}");
                if let Err(rollback) = rollback_detach(ws, &session) {
                    log::warn!("rolling back detach of {target}: {rollback}");
                }
                stop_visuals(ws, host, target);
                finish(ws, host);
                return Err(err);
            }
        }
        ws.set_dragging(target, true)?;
        host.set_drag_layer(target, true);

        log::debug!("drag start {target} (requested {block}) at {start_loc:?}");
        self.session = Some(session);
        self.phase = DragPhase::Dragging;
        Ok(target)
    }

    /// One pointer-move tick. Returns the candidate held after the tick.
    pub fn drag(
        &mut self,
        ws: &Workspace,
        host: &mut dyn RenderHost,
        location: Coordinate,
    ) -> EditorResult<Option<ConnectionCandidate>> {
        let session = self.session.as_mut().ok_or(EditorError::NoActiveDrag)?;
        ensure_finite(location)?;
        let location = location + session.drag_offset;
        session.current_loc = location;
        let delta = location - session.start_loc;
        host.move_during_drag(session.block, location);

        let found = candidate::find_candidate(ws, session.block, session.candidate.is_some(), delta)?;
        let Some(found) = found else {
            if session.candidate.take().is_some() {
                host.hide_preview();
            }
            log::trace!("drag {} at {location:?}: no candidate", session.block);
            return Ok(None);
        };

        let chosen = match session.candidate {
            Some(held) => {
                let held_distance = candidate::current_distance(ws, &held, delta)?;
                let preference = ws.config().current_connection_preference;
                if prefers_held(held_distance, found.distance, preference) {
                    ConnectionCandidate {
                        distance: held_distance,
                        ..held
                    }
                } else {
                    found
                }
            }
            None => found,
        };

        let changed = session
            .candidate
            .map_or(true, |c| (c.local, c.neighbour) != (chosen.local, chosen.neighbour));
        session.candidate = Some(chosen);
        if changed {
            match candidate::replaced_block(ws, session.block, &chosen)? {
                Some(occupant) => host.preview_replacement(chosen.local, chosen.neighbour, occupant),
                None => host.preview_connection(chosen.local, chosen.neighbour),
            }
        }
        log::trace!(
            "drag {} at {location:?}: candidate {} -> {} ({:.2})",
            session.block,
            chosen.local,
            chosen.neighbour,
            chosen.distance
        );
        Ok(Some(chosen))
    }

    /// Finish the gesture at `location`: connect the held candidate or drop
    /// the block where it is.
    pub fn end_drag(
        &mut self,
        ws: &mut Workspace,
        host: &mut dyn RenderHost,
        location: Coordinate,
    ) -> EditorResult<DragOutcome> {
        let session = self.session.take().ok_or(EditorError::NoActiveDrag)?;
        self.phase = DragPhase::Applying;
        let block = session.block;
        let location = location + session.drag_offset;

        let descendants = ws.descendants(block).unwrap_or_else(|_| vec![block]);
        ws.events.fire(BlockEvent::Drag {
            block,
            is_start: false,
            descendants,
        });
        stop_visuals(ws, host, block);
        let result = apply_drop(ws, host, &session, location);
        finish(ws, host);
        self.phase = DragPhase::Idle;

        match &result {
            Ok(outcome) => log::debug!("drag end {block}: {outcome:?}"),
            Err(err) => log::warn!("drag end {block} failed: {err}"),
        }
        result
    }

    /// Cancel the gesture and put the block back where it came from.
    pub fn revert_drag(&mut self, ws: &mut Workspace, host: &mut dyn RenderHost) -> EditorResult<()> {
        let session = self.session.take().ok_or(EditorError::NoActiveDrag)?;
        self.phase = DragPhase::Reverting;
        let block = session.block;

        let result = restore(ws, &session);
        if ws.contains_block(block) {
            let descendants = ws.descendants(block).unwrap_or_else(|_| vec![block]);
            ws.events.fire(BlockEvent::Drag {
                block,
                is_start: false,
                descendants,
            });
        }
        stop_visuals(ws, host, block);
        finish(ws, host);
        self.phase = DragPhase::Idle;

        if let Err(err) = &result {
            log::warn!("revert of {block} failed: {err}");
        } else {
            log::debug!("drag of {block} reverted");
        }
        result
    }
}

/// A placeholder that may not be dragged on its own hands the gesture to its
/// nearest non-placeholder ancestor. The offset maps locations reported for
/// the placeholder onto that ancestor.
fn resolve_drag_target(ws: &Workspace, block: BlockId) -> EditorResult<(BlockId, Coordinate)> {
    let b = ws.block(block)?;
    if !b.shadow || ws.config().is_draggable_shadow(&b.type_name) {
        return Ok((block, Coordinate::ORIGIN));
    }
    let mut current = block;
    loop {
        let parent = ws
            .parent(current)?
            .ok_or(EditorError::ShadowWithoutParent(current))?;
        let p = ws.block(parent)?;
        if !p.shadow {
            return Ok((parent, p.xy - b.xy));
        }
        current = parent;
    }
}

/// Placeholders always duplicate. Otherwise the block's override decides, and
/// without one the configured rules do.
pub fn should_duplicate(ws: &Workspace, block: BlockId) -> EditorResult<bool> {
    let b = ws.block(block)?;
    if b.shadow {
        return Ok(true);
    }
    if let Some(value) = b.duplicate_on_drag {
        return Ok(value);
    }
    let Some(parent) = ws.parent(block)? else {
        return Ok(false);
    };
    let input = ws.parent_input_name(block)?;
    Ok(ws.config().duplicate_on_drag.matches(
        &ws.block(parent)?.type_name,
        input.as_deref(),
        &b.type_name,
    ))
}

fn detach(
    ws: &mut Workspace,
    host: &mut dyn RenderHost,
    session: &mut DragSession,
    heal_stack: bool,
) -> EditorResult<()> {
    let block = session.block;
    // Decided before the placeholder flag is cleared below.
    let duplicate = should_duplicate(ws, block)?;
    let b = ws.block(block)?;
    let was_shadow = b.shadow;
    let (output, next) = (b.output, b.next);
    session.was_shadow = was_shadow;
    session.prior_override = b.duplicate_on_drag;

    let socket = match output {
        Some(out) => ws.connection(out)?.target,
        None => None,
    };
    if was_shadow {
        if let Some(socket) = socket {
            if ws.connection(socket)?.shadow_state.is_none() {
                let template = ws.save_block(block)?;
                ws.connection_mut(socket)?.shadow_state = Some(Box::new(template));
                session.stored_template = Some(socket);
            }
        }
        ws.set_shadow(block, false)?;
    }

    session.start_parent_conn = ws.parent_connection(block)?;
    if heal_stack {
        session.start_child_conn = match next {
            Some(next) => ws.connection(next)?.target,
            None => None,
        };
    }

    let copy_state = match socket {
        Some(_) if duplicate && !was_shadow => Some(ws.save_block(block)?),
        _ => None,
    };
    ws.unplug(block, heal_stack)?;
    if let (Some(state), Some(socket)) = (copy_state, socket) {
        let copy = ws.restore_block(&state)?;
        session.duplicate = Some(copy);
        ws.attach_child(socket, copy)?;
        ws.set_duplicate_override(block, Some(false))?;
        log::debug!("left copy {copy} of {block} in {socket}");
    }
    host.disconnect_effect(block);
    Ok(())
}

fn apply_drop(
    ws: &mut Workspace,
    host: &mut dyn RenderHost,
    session: &DragSession,
    location: Coordinate,
) -> EditorResult<DragOutcome> {
    let block = session.block;
    ws.move_to(block, location, "drag")?;

    let outcome = match session.candidate {
        Some(candidate) => {
            ws.connect(candidate.local, candidate.neighbour)?;
            let inferior_end = if ws.connection(candidate.local)?.kind.is_superior() {
                candidate.neighbour
            } else {
                candidate.local
            };
            let inferior = ws.connection(inferior_end)?.block;
            let root = ws.root_block(block)?;
            ws.tasks
                .after_layout(DeferredAction::ConnectionFeedback { inferior, root });
            DragOutcome::Connected { block, candidate }
        }
        None => {
            host.queue_render(block);
            DragOutcome::Dropped { block, location }
        }
    };
    ws.snap_to_grid(block)?;
    Ok(outcome)
}

fn restore(ws: &mut Workspace, session: &DragSession) -> EditorResult<()> {
    let block = session.block;
    if let Some(copy) = session.duplicate {
        if ws.contains_block(copy) {
            ws.dispose_block(copy)?;
        }
    }
    ws.set_duplicate_override(block, session.prior_override)?;

    if let Some(child_end) = session.start_child_conn {
        let child_alive = ws.connection(child_end).is_ok();
        if let (true, Some(next)) = (child_alive, ws.block(block)?.next) {
            ws.connect(child_end, next)?;
        }
    }

    let parent_end = session
        .start_parent_conn
        .filter(|c| ws.connection(*c).is_ok());
    let plug = match parent_end {
        Some(parent_end) => {
            let b = ws.block(block)?;
            match ws.connection(parent_end)?.kind {
                ConnectionType::InputValue => b.output,
                ConnectionType::NextStatement => b.previous,
                _ => None,
            }
        }
        None => None,
    };
    match (parent_end, plug) {
        (Some(parent_end), Some(plug)) => ws.connect(parent_end, plug)?,
        _ if ws.parent(block)?.is_some() => {}
        _ => {
            ws.move_to(block, session.start_loc, "drag")?;
            ws.bump_into_bounds(block)?;
        }
    }
    if session.was_shadow {
        if ws.parent(block)?.is_some() {
            ws.set_shadow(block, true)?;
        } else {
            log::debug!("{block} lost its parent during the drag; keeping it as a real block");
        }
    }
    Ok(())
}

/// Undo whatever a failed [`detach`] got through: the copy, the override,
/// the stored template and the unplugging.
fn rollback_detach(ws: &mut Workspace, session: &DragSession) -> EditorResult<()> {
    let result = restore(ws, session);
    if let Some(socket) = session.stored_template {
        if let Ok(conn) = ws.connection_mut(socket) {
            conn.shadow_state = None;
        }
    }
    result
}

/// Drop transient drag visuals. Runs before the graph is touched on drop.
fn stop_visuals(ws: &mut Workspace, host: &mut dyn RenderHost, block: BlockId) {
    if ws.contains_block(block) {
        if let Err(err) = ws.set_dragging(block, false) {
            log::warn!("clearing drag flag on {block}: {err}");
        }
    }
    host.set_text_width_cache(false);
    host.stop_disconnect_effect();
    host.hide_preview();
    host.set_drag_layer(block, false);
}

/// Cleanup shared by every exit path.
fn finish(ws: &mut Workspace, host: &mut dyn RenderHost) {
    host.dispose_preview();
    host.set_resizes_enabled(true);
    ws.events.set_group(false);
}
