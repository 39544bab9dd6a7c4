//! Candidate search for an in-progress drag.

use serde::{Deserialize, Serialize};

use crate::block::{Connection, ConnectionType};
use crate::error::EditorResult;
use crate::geometry::Coordinate;
use crate::ids::{BlockId, ConnectionId};
use crate::workspace::Workspace;

/// Tentative best match between an end on the dragged block and one on the canvas.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCandidate {
    pub local: ConnectionId,
    pub neighbour: ConnectionId,
    pub distance: f64,
}

/// Sticky tie-break: the held candidate survives unless the new one is closer
/// by more than `preference`.
pub fn prefers_held(held_distance: f64, new_distance: f64, preference: f64) -> bool {
    held_distance - new_distance <= preference
}

/// Ends of the dragged block a drop could use, plus the free next connection
/// at the bottom of its own stack.
pub(crate) fn local_connections(ws: &Workspace, block: BlockId) -> EditorResult<Vec<ConnectionId>> {
    let b = ws.block(block)?;
    let mut out = b.connections();
    if let Some(last) = ws.last_connection_in_stack(block, true)? {
        if Some(last) != b.next {
            out.push(last);
        }
    }
    Ok(out)
}

/// Whether `neighbour` may be offered for `local` while dragging.
/// `dragged` holds the dragged block and all of its descendants.
fn drag_compatible(
    ws: &Workspace,
    dragged: &[BlockId],
    dragged_has_next: bool,
    local: &Connection,
    neighbour: &Connection,
) -> bool {
    if dragged.contains(&neighbour.block) || !local.checks_compatible(neighbour) {
        return false;
    }
    match ws.block(neighbour.block) {
        Ok(owner) if !owner.in_flyout => {}
        _ => return false,
    }
    match neighbour.kind {
        ConnectionType::InputValue => {
            if local.is_connected() {
                return false;
            }
            match neighbour.target.and_then(|t| ws.connection(t).ok()) {
                Some(occupant_end) => ws
                    .block(occupant_end.block)
                    .map_or(false, |occupant| occupant.movable || occupant.shadow),
                None => true,
            }
        }
        ConnectionType::OutputValue | ConnectionType::PreviousStatement => {
            !local.is_connected() && !neighbour.is_connected()
        }
        ConnectionType::NextStatement => {
            !local.is_connected() && (!neighbour.is_connected() || dragged_has_next)
        }
    }
}

/// Closest compatible neighbour over all local ends at `delta` from the drag
/// start. Each hit tightens the radius for the ends after it.
pub(crate) fn find_candidate(
    ws: &Workspace,
    block: BlockId,
    holding: bool,
    delta: Coordinate,
) -> EditorResult<Option<ConnectionCandidate>> {
    let config = ws.config();
    let mut radius = if holding {
        config.connecting_snap_radius
    } else {
        config.snap_radius
    };
    let dragged = ws.descendants(block)?;
    let has_next = ws.block(block)?.next.is_some();

    let mut best = None;
    for local in local_connections(ws, block)? {
        let hit = ws.closest(local, radius, delta, |l, n| {
            drag_compatible(ws, &dragged, has_next, l, n)
        })?;
        if let Some((neighbour, distance)) = hit {
            best = Some(ConnectionCandidate {
                local,
                neighbour,
                distance,
            });
            radius = distance;
        }
    }
    Ok(best)
}

/// Distance between the candidate's ends with the dragged side offset by `delta`.
pub(crate) fn current_distance(
    ws: &Workspace,
    candidate: &ConnectionCandidate,
    delta: Coordinate,
) -> EditorResult<f64> {
    let local = ws.connection_position(candidate.local)? + delta;
    Ok(local.distance(ws.connection_position(candidate.neighbour)?))
}

/// The real block a drop on `candidate` would displace without a new home,
/// if any.
pub(crate) fn replaced_block(
    ws: &Workspace,
    block: BlockId,
    candidate: &ConnectionCandidate,
) -> EditorResult<Option<BlockId>> {
    if !ws.connection(candidate.local)?.kind.is_plug() {
        return Ok(None);
    }
    let Some(occupant_end) = ws.connection(candidate.neighbour)?.target else {
        return Ok(None);
    };
    let occupant = ws.connection(occupant_end)?.block;
    if ws.block(occupant)?.shadow {
        return Ok(None);
    }
    if orphan_can_connect_at_end(ws, block, occupant_end)? {
        return Ok(None);
    }
    Ok(Some(occupant))
}

/// Whether the displaced end could trail the dragged block's own tree.
pub(crate) fn orphan_can_connect_at_end(
    ws: &Workspace,
    block: BlockId,
    orphan_end: ConnectionId,
) -> EditorResult<bool> {
    Ok(ws
        .connection_for_orphaned_connection(block, orphan_end)?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_candidate_is_sticky_within_margin() {
        assert!(prefers_held(20.0, 15.0, 8.0));
        assert!(prefers_held(20.0, 12.0, 8.0));
        assert!(!prefers_held(20.0, 11.5, 8.0));
        assert!(prefers_held(10.0, 14.0, 8.0));
        assert!(!prefers_held(1.0, 0.0, 0.0));
    }
}
