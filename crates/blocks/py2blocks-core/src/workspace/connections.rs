//! Connecting, disconnecting and searching connection ends.

use crate::block::{Connection, ConnectionType};
use crate::error::{EditorError, EditorResult};
use crate::events::BlockEvent;
use crate::geometry::Coordinate;
use crate::ids::{BlockId, ConnectionId};

use super::Workspace;

impl Workspace {
    /// Type-level compatibility: complementary kinds, intersecting checks,
    /// distinct blocks.
    pub fn can_connect_types(&self, a: ConnectionId, b: ConnectionId) -> EditorResult<bool> {
        let a = self.connection(a)?;
        let b = self.connection(b)?;
        Ok(a.block != b.block && a.kind.opposite() == b.kind && a.checks_compatible(b))
    }

    /// Connect two ends. The child end is unplugged from wherever it was; a
    /// placeholder occupying the parent end is disposed and kept as the input's
    /// template; a real occupant is re-attached below the new child when
    /// possible and bumped otherwise.
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> EditorResult<()> {
        if !self.can_connect_types(a, b)? {
            return Err(EditorError::IncompatibleConnection(a, b));
        }
        let (parent_end, child_end) = if self.connection(a)?.kind.is_superior() {
            (a, b)
        } else {
            (b, a)
        };
        if self.connection(parent_end)?.target == Some(child_end) {
            return Ok(());
        }
        let child = self.connection(child_end)?.block;

        if self.connection(child_end)?.is_connected() {
            self.disconnect_inner(child_end, true)?;
        }

        let mut orphan = None;
        if let Some(occupant_end) = self.connection(parent_end)?.target {
            let occupant = self.connection(occupant_end)?.block;
            self.disconnect_inner(parent_end, false)?;
            if self.block(occupant)?.shadow {
                let template = self.save_block(occupant)?;
                self.dispose_subtree(occupant);
                self.connection_mut(parent_end)?.shadow_state = Some(Box::new(template));
            } else {
                orphan = Some((occupant, occupant_end));
            }
        }

        self.connection_mut(parent_end)?.target = Some(child_end);
        self.connection_mut(child_end)?.target = Some(parent_end);
        self.top_blocks.retain(|b| *b != child);
        self.align_child(parent_end)?;
        self.events.fire(BlockEvent::Connect {
            parent: parent_end,
            child,
        });
        log::debug!("connected {child} to {parent_end}");

        if let Some((orphan, orphan_end)) = orphan {
            self.rehome_orphan(orphan, orphan_end, child)?;
        }
        Ok(())
    }

    fn rehome_orphan(
        &mut self,
        orphan: BlockId,
        orphan_end: ConnectionId,
        new_child: BlockId,
    ) -> EditorResult<()> {
        match self.connection_for_orphaned_connection(new_child, orphan_end)? {
            Some(socket) => {
                log::debug!("re-attaching orphan {orphan} at {socket}");
                self.connect(socket, orphan_end)
            }
            None => {
                log::debug!("bumping orphan {orphan}");
                self.bump_block(orphan)
            }
        }
    }

    /// Break the link at `conn` (either end). The parent input gets its
    /// placeholder back.
    pub fn disconnect(&mut self, conn: ConnectionId) -> EditorResult<()> {
        self.disconnect_inner(conn, true).map(|_| ())
    }

    pub(crate) fn disconnect_inner(
        &mut self,
        conn: ConnectionId,
        respawn: bool,
    ) -> EditorResult<Option<BlockId>> {
        let c = self.connection(conn)?;
        let Some(target) = c.target else {
            return Ok(None);
        };
        let (parent_end, child_end) = if c.kind.is_superior() {
            (conn, target)
        } else {
            (target, conn)
        };
        let child = self.connection(child_end)?.block;
        self.connection_mut(parent_end)?.target = None;
        self.connection_mut(child_end)?.target = None;
        if !self.top_blocks.contains(&child) {
            self.top_blocks.push(child);
        }
        self.events.fire(BlockEvent::Disconnect {
            parent: parent_end,
            child,
        });
        if respawn {
            self.respawn_shadow(parent_end)?;
        }
        Ok(Some(child))
    }

    /// Detach `id` from its parent. With `heal_stack`, the statement below
    /// takes its place.
    pub fn unplug(&mut self, id: BlockId, heal_stack: bool) -> EditorResult<()> {
        let block = self.block(id)?;
        let (output, previous, next) = (block.output, block.previous, block.next);

        if let Some(output) = output {
            if self.connection(output)?.is_connected() {
                self.disconnect_inner(output, true)?;
            }
            return Ok(());
        }
        let Some(previous) = previous else {
            return Ok(());
        };

        let previous_target = self.connection(previous)?.target;
        if previous_target.is_some() {
            self.disconnect_inner(previous, true)?;
        }
        let Some(next) = next else {
            return Ok(());
        };
        let next_target = self.connection(next)?.target;
        if let (true, Some(next_target)) = (heal_stack, next_target) {
            let next_block = self.connection(next_target)?.block;
            if self.block(next_block)?.shadow {
                return Ok(());
            }
            self.disconnect_inner(next, false)?;
            if let Some(parent_end) = previous_target {
                if self.can_connect_types(parent_end, next_target)?
                    && !self.connection(parent_end)?.is_connected()
                {
                    self.connect(parent_end, next_target)?;
                }
            }
        }
        Ok(())
    }

    /// Spawn the input's placeholder when it has a template and nothing attached.
    pub fn respawn_shadow(&mut self, conn: ConnectionId) -> EditorResult<Option<BlockId>> {
        let c = self.connection(conn)?;
        if c.is_connected() {
            return Ok(None);
        }
        let Some(template) = c.shadow_state.clone() else {
            return Ok(None);
        };
        let mut template = *template;
        template.shadow = true;
        let shadow = self.restore_block(&template)?;
        self.attach_child(conn, shadow)?;
        Ok(Some(shadow))
    }

    /// Nearest end within `max_radius` of `local` (offset by `delta`) that
    /// complements it and passes `accept`. Distance ties go to the later end.
    pub fn closest<F>(
        &self,
        local: ConnectionId,
        max_radius: f64,
        delta: Coordinate,
        mut accept: F,
    ) -> EditorResult<Option<(ConnectionId, f64)>>
    where
        F: FnMut(&Connection, &Connection) -> bool,
    {
        let local_conn = self.connection(local)?;
        let origin = self.connection_position(local)? + delta;
        let wanted = local_conn.kind.opposite();

        let mut best = None;
        let mut radius = max_radius;
        for (id, candidate) in &self.connections {
            if candidate.kind != wanted || candidate.block == local_conn.block {
                continue;
            }
            let Some(owner) = self.blocks.get(&candidate.block) else {
                continue;
            };
            let distance = origin.distance(owner.xy + candidate.offset);
            if distance <= radius && accept(local_conn, candidate) {
                best = Some((*id, distance));
                radius = distance;
            }
        }
        Ok(best)
    }

    /// Free next connection at the bottom of the stack starting at `id`.
    pub fn last_connection_in_stack(
        &self,
        id: BlockId,
        ignore_shadows: bool,
    ) -> EditorResult<Option<ConnectionId>> {
        let mut current = id;
        loop {
            let Some(next) = self.block(current)?.next else {
                return Ok(None);
            };
            match self.connected_block(next)? {
                Some(below) if !(ignore_shadows && self.block(below)?.shadow) => current = below,
                _ => return Ok(Some(next)),
            }
        }
    }

    /// Where an orphaned end could be re-attached inside the tree of `start`.
    ///
    /// Value orphans follow the chain of single compatible inputs down to an
    /// empty or placeholder-filled one. Statement orphans go to the end of the
    /// stack.
    pub fn connection_for_orphaned_connection(
        &self,
        start: BlockId,
        orphan_end: ConnectionId,
    ) -> EditorResult<Option<ConnectionId>> {
        let orphan = self.connection(orphan_end)?;
        if orphan.kind == ConnectionType::OutputValue {
            let mut current = start;
            while let Some(socket) = self.single_connection(current, orphan_end)? {
                match self.connected_block(socket)? {
                    None => return Ok(Some(socket)),
                    Some(occupant) if self.block(occupant)?.shadow => return Ok(Some(socket)),
                    Some(occupant) => current = occupant,
                }
            }
            return Ok(None);
        }

        let Some(last) = self.last_connection_in_stack(start, true)? else {
            return Ok(None);
        };
        if self.can_connect_types(orphan_end, last)? {
            Ok(Some(last))
        } else {
            Ok(None)
        }
    }

    /// The only input of `block` the orphan's output fits, if exactly one does.
    fn single_connection(
        &self,
        block: BlockId,
        orphan_end: ConnectionId,
    ) -> EditorResult<Option<ConnectionId>> {
        let mut found = None;
        for input in &self.block(block)?.inputs {
            let Some(conn) = input.connection else {
                continue;
            };
            if self.can_connect_types(orphan_end, conn)? {
                if found.is_some() {
                    return Ok(None);
                }
                found = Some(conn);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EditorConfig;
    use crate::error::EditorError;
    use crate::events::BlockEvent;
    use crate::schema::BlockRegistry;
    use crate::state::BlockState;
    use crate::workspace::Workspace;

    fn workspace() -> Workspace {
        Workspace::new(EditorConfig::default(), BlockRegistry::builtin()).expect("workspace")
    }

    #[test]
    fn connect_rejects_mismatched_kinds() {
        let mut ws = workspace();
        let a = ws.new_block("int").expect("int");
        let b = ws.new_block("int").expect("int");
        let out_a = ws.block(a).expect("a").output.expect("output");
        let out_b = ws.block(b).expect("b").output.expect("output");
        assert_eq!(
            ws.connect(out_a, out_b),
            Err(EditorError::IncompatibleConnection(out_a, out_b))
        );
    }

    #[test]
    fn replacing_a_placeholder_keeps_it_as_template() {
        let mut ws = workspace();
        let ret = ws.new_block("Return").expect("return");
        let input = ws.input_connection(ret, "value").expect("value");
        let shadow = ws.new_shadow_block("int").expect("shadow");
        ws.set_field(shadow, "value", "7").expect("field");
        ws.attach_child(input, shadow).expect("attach shadow");

        let name = ws.new_block("Name").expect("name");
        ws.attach_child(input, name).expect("attach name");
        assert!(ws.is_disposed(shadow));
        let template = ws
            .connection(input)
            .expect("input")
            .shadow_state
            .clone()
            .expect("template");
        assert_eq!(template.type_name, "int");
        assert_eq!(template.fields.get("value").map(String::as_str), Some("7"));

        ws.disconnect(input).expect("disconnect");
        let respawned = ws.connected_block(input).expect("query").expect("respawned");
        assert_eq!(ws.block(respawned).expect("block").field_value("value"), Some("7"));
    }

    #[test]
    fn real_occupant_is_rehomed_into_single_input() {
        let mut ws = workspace();
        let print = ws.new_block("print_block").expect("print");
        let arg = ws.input_connection(print, "ARG0").expect("arg");
        let old = ws.new_block("Name").expect("name");
        ws.attach_child(arg, old).expect("attach");

        // dict_unpack has exactly one value input, so the displaced Name lands there.
        let unpack = ws.new_block("dict_unpack").expect("unpack");
        ws.attach_child(arg, unpack).expect("replace");
        assert_eq!(ws.parent(old).expect("parent"), Some(unpack));
    }

    #[test]
    fn real_occupant_without_home_is_bumped() {
        let mut ws = workspace();
        let print = ws.new_block("print_block").expect("print");
        let arg = ws.input_connection(print, "ARG0").expect("arg");
        let old = ws.new_block("Name").expect("name");
        ws.attach_child(arg, old).expect("attach");
        let before = ws.block(old).expect("old").xy;

        let int = ws.new_block("int").expect("int");
        ws.attach_child(arg, int).expect("replace");
        assert_eq!(ws.parent(old).expect("parent"), None);
        assert!(ws.top_blocks().contains(&old));
        let after = ws.block(old).expect("old").xy;
        assert_eq!(after.x - before.x, ws.config().bump_delta);
    }

    #[test]
    fn unplug_heals_statement_stack() {
        let mut ws = workspace();
        let a = ws.new_block("Assign").expect("a");
        let b = ws.new_block("Assign").expect("b");
        let c = ws.new_block("Assign").expect("c");
        let a_next = ws.block(a).expect("a").next.expect("next");
        let b_next = ws.block(b).expect("b").next.expect("next");
        ws.attach_child(a_next, b).expect("a-b");
        ws.attach_child(b_next, c).expect("b-c");

        ws.unplug(b, true).expect("unplug");
        assert_eq!(ws.next_block(a).expect("next"), Some(c));
        assert_eq!(ws.parent(b).expect("parent"), None);
        assert_eq!(ws.next_block(b).expect("next"), None);
    }

    #[test]
    fn unplug_without_heal_takes_the_stack() {
        let mut ws = workspace();
        let a = ws.new_block("Assign").expect("a");
        let b = ws.new_block("Assign").expect("b");
        let c = ws.new_block("Pass").expect("c");
        let a_next = ws.block(a).expect("a").next.expect("next");
        let b_next = ws.block(b).expect("b").next.expect("next");
        ws.attach_child(a_next, b).expect("a-b");
        ws.attach_child(b_next, c).expect("b-c");

        ws.unplug(b, false).expect("unplug");
        assert_eq!(ws.next_block(a).expect("next"), None);
        assert_eq!(ws.next_block(b).expect("next"), Some(c));
        // Pass has no next connection, so the stack ends on b.
        assert_eq!(
            ws.last_connection_in_stack(b, true).expect("last"),
            None
        );
    }

    #[test]
    fn closest_respects_radius_and_filter() {
        let mut ws = workspace();
        let ret = ws.new_block("Return").expect("return");
        let socket = ws.input_connection(ret, "value").expect("socket");
        let int = ws.new_block("int").expect("int");
        let plug = ws.block(int).expect("int").output.expect("output");
        let socket_at = ws.connection_position(socket).expect("pos");
        ws.move_to(int, socket_at + crate::geometry::Coordinate::new(10.0, 0.0), "test")
            .expect("move");

        let hit = ws
            .closest(plug, 28.0, crate::geometry::Coordinate::ORIGIN, |_, _| true)
            .expect("search");
        assert_eq!(hit.map(|(c, _)| c), Some(socket));
        let miss = ws
            .closest(plug, 5.0, crate::geometry::Coordinate::ORIGIN, |_, _| true)
            .expect("search");
        assert_eq!(miss, None);
        let filtered = ws
            .closest(plug, 28.0, crate::geometry::Coordinate::ORIGIN, |_, _| false)
            .expect("search");
        assert_eq!(filtered, None);
    }

    #[test]
    fn connect_fires_events_and_reparents() {
        let mut ws = workspace();
        let ret = ws.new_block("Return").expect("return");
        let input = ws.input_connection(ret, "value").expect("value");
        let int = ws.new_block("int").expect("int");
        ws.events.drain();
        ws.attach_child(input, int).expect("attach");
        assert!(ws
            .events
            .events()
            .iter()
            .any(|e| e.event == BlockEvent::Connect { parent: input, child: int }));
        assert!(!ws.top_blocks().contains(&int));

        ws.set_shadow_state(input, Some(BlockState::shadow("int")))
            .expect("template");
        assert_eq!(ws.connected_block(input).expect("q"), Some(int));
    }
}
