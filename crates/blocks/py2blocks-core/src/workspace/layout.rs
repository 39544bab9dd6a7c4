//! Block positions, connection offsets, grid snapping and bumping.
//!
//! Offsets follow a fixed row/column scheme: value inputs step right along
//! the top edge, statement inputs step down an indented column and the next
//! connection sits below the last row. It is enough for proximity searches;
//! real geometry belongs to the host renderer.

use crate::block::InputKind;
use crate::error::{EditorError, EditorResult};
use crate::events::BlockEvent;
use crate::geometry::Coordinate;
use crate::ids::{BlockId, ConnectionId};

use super::Workspace;

const COLUMN_WIDTH: f64 = 40.0;
const ROW_HEIGHT: f64 = 40.0;
const STATEMENT_INDENT: f64 = 16.0;

pub(crate) fn ensure_finite(xy: Coordinate) -> EditorResult<()> {
    if xy.is_finite() {
        Ok(())
    } else {
        Err(EditorError::NonFiniteLocation { x: xy.x, y: xy.y })
    }
}

impl Workspace {
    pub fn connection_position(&self, conn: ConnectionId) -> EditorResult<Coordinate> {
        let c = self.connection(conn)?;
        Ok(self.block(c.block)?.xy + c.offset)
    }

    /// Move `id` and everything attached below it so that `id` sits at `xy`.
    pub fn move_to(&mut self, id: BlockId, xy: Coordinate, reason: &str) -> EditorResult<()> {
        ensure_finite(xy)?;
        let old_xy = self.block(id)?.xy;
        self.translate_subtree(id, xy - old_xy)?;
        self.events.fire(BlockEvent::Move {
            block: id,
            old_xy,
            new_xy: xy,
            reason: reason.to_string(),
        });
        Ok(())
    }

    pub fn move_by(&mut self, id: BlockId, delta: Coordinate, reason: &str) -> EditorResult<()> {
        let xy = self.block(id)?.xy + delta;
        self.move_to(id, xy, reason)
    }

    fn translate_subtree(&mut self, id: BlockId, delta: Coordinate) -> EditorResult<()> {
        if delta == Coordinate::ORIGIN {
            return Ok(());
        }
        for b in self.descendants(id)? {
            let block = self.block_mut(b)?;
            block.xy = block.xy + delta;
        }
        Ok(())
    }

    /// Recompute connection offsets of `id` and pull attached children onto
    /// their sockets.
    pub(crate) fn relayout(&mut self, id: BlockId) -> EditorResult<()> {
        let block = self.block(id)?;
        let mut offsets = Vec::new();
        offsets.extend(block.output.map(|c| (c, Coordinate::ORIGIN)));
        offsets.extend(block.previous.map(|c| (c, Coordinate::ORIGIN)));
        for (index, input) in block.inputs.iter().enumerate() {
            let Some(conn) = input.connection else {
                continue;
            };
            let step = (index + 1) as f64;
            let offset = match input.kind {
                InputKind::Statement => Coordinate::new(STATEMENT_INDENT, ROW_HEIGHT * step),
                _ => Coordinate::new(COLUMN_WIDTH * step, 0.0),
            };
            offsets.push((conn, offset));
        }
        let rows = (block.inputs.len() + 1) as f64;
        offsets.extend(block.next.map(|c| (c, Coordinate::new(0.0, ROW_HEIGHT * rows))));

        let sockets: Vec<ConnectionId> = offsets
            .iter()
            .map(|(c, _)| *c)
            .filter(|c| {
                self.connections
                    .get(c)
                    .map_or(false, |conn| conn.kind.is_superior() && conn.is_connected())
            })
            .collect();
        for (conn, offset) in offsets {
            self.connection_mut(conn)?.offset = offset;
        }
        for socket in sockets {
            self.align_child(socket)?;
        }
        Ok(())
    }

    /// Translate the child plugged into `socket` so its end meets the socket.
    pub(crate) fn align_child(&mut self, socket: ConnectionId) -> EditorResult<()> {
        let Some(plug) = self.connection(socket)?.target else {
            return Ok(());
        };
        let plug_conn = self.connection(plug)?;
        let child = plug_conn.block;
        let wanted = self.connection_position(socket)? - plug_conn.offset;
        let delta = wanted - self.block(child)?.xy;
        self.translate_subtree(child, delta)
    }

    /// Round a top-level block to the nearest grid point when snapping is on.
    /// Returns whether the block moved.
    pub fn snap_to_grid(&mut self, id: BlockId) -> EditorResult<bool> {
        let Some(grid) = self.config.grid.filter(|g| g.snap) else {
            return Ok(false);
        };
        if self.parent(id)?.is_some() {
            return Ok(false);
        }
        let xy = self.block(id)?.xy;
        let snapped = Coordinate::new(
            (xy.x / grid.spacing).round() * grid.spacing,
            (xy.y / grid.spacing).round() * grid.spacing,
        );
        if snapped == xy {
            return Ok(false);
        }
        self.move_to(id, snapped, "snap")?;
        Ok(true)
    }

    /// Pull a top-level block back inside the visible viewport, if one is set.
    pub fn bump_into_bounds(&mut self, id: BlockId) -> EditorResult<bool> {
        let Some(viewport) = self.viewport else {
            return Ok(false);
        };
        if self.parent(id)?.is_some() {
            return Ok(false);
        }
        let xy = self.block(id)?.xy;
        if viewport.contains(xy) {
            return Ok(false);
        }
        self.move_to(id, viewport.clamp(xy), "bump")?;
        Ok(true)
    }

    /// Nudge an orphan away from the connection it lost.
    pub(crate) fn bump_block(&mut self, id: BlockId) -> EditorResult<()> {
        let d = self.config.bump_delta;
        self.move_by(id, Coordinate::new(d, d), "bump")
    }
}
