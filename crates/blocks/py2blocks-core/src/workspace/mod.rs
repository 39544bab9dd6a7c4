//! In-memory block graph: the graph half of the canvas host.
//!
//! The workspace owns every block and connection, the event log, the deferred
//! task queue and the procedure registry. Shape and drag handlers operate on
//! it through the methods here and in the `connections` and `layout`
//! submodules.

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;

use crate::block::{Block, Connection, ConnectionType, Field, Input, InputKind};
use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::events::{BlockEvent, EventLog};
use crate::geometry::{Coordinate, Rect};
use crate::ids::{BlockId, ConnectionId, IdAllocator};
use crate::procedures::ProcedureRegistry;
use crate::schema::{BlockRegistry, ContainerKind, ContainerSpec, InputTemplate};
use crate::state::BlockState;
use crate::tasks::TaskQueue;
use crate::variadic;

mod connections;
mod layout;

pub(crate) use layout::ensure_finite;

/// Field holding the procedure name on call blocks.
pub const CALL_NAME_FIELD: &str = "func";

pub struct Workspace {
    config: EditorConfig,
    registry: BlockRegistry,
    ids: IdAllocator,
    blocks: HashMap<BlockId, Block>,
    /// Insertion ordered so nearest-connection searches are deterministic.
    connections: IndexMap<ConnectionId, Connection>,
    top_blocks: Vec<BlockId>,
    procedures: ProcedureRegistry,
    viewport: Option<Rect>,
    pub events: EventLog,
    pub tasks: TaskQueue,
}

/// Blocks and connections removed by one disposal, unlinked together.
#[derive(Default)]
struct Graveyard {
    blocks: HashSet<BlockId>,
    connections: HashSet<ConnectionId>,
}

impl Workspace {
    pub fn new(config: EditorConfig, registry: BlockRegistry) -> EditorResult<Self> {
        config.validate()?;
        let events = EventLog::with_capacity(config.event_log_capacity);
        Ok(Self {
            config,
            registry,
            ids: IdAllocator::new(),
            blocks: HashMap::new(),
            connections: IndexMap::new(),
            top_blocks: Vec::new(),
            procedures: ProcedureRegistry::new(),
            viewport: None,
            events,
            tasks: TaskQueue::new(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn procedures(&self) -> &ProcedureRegistry {
        &self.procedures
    }

    pub fn block(&self, id: BlockId) -> EditorResult<&Block> {
        self.blocks.get(&id).ok_or(EditorError::UnknownBlock(id))
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> EditorResult<&mut Block> {
        self.blocks.get_mut(&id).ok_or(EditorError::UnknownBlock(id))
    }

    pub fn connection(&self, id: ConnectionId) -> EditorResult<&Connection> {
        self.connections
            .get(&id)
            .ok_or(EditorError::UnknownConnection(id))
    }

    pub(crate) fn connection_mut(&mut self, id: ConnectionId) -> EditorResult<&mut Connection> {
        self.connections
            .get_mut(&id)
            .ok_or(EditorError::UnknownConnection(id))
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn is_disposed(&self, id: BlockId) -> bool {
        !self.contains_block(id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Live block ids in ascending order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.blocks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn blocks_of_type(&self, type_name: &str) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self
            .blocks
            .values()
            .filter(|b| b.type_name == type_name)
            .map(|b| b.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn top_blocks(&self) -> &[BlockId] {
        &self.top_blocks
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Option<Rect>) {
        self.viewport = viewport;
    }

    pub fn container_spec(&self, id: BlockId) -> EditorResult<ContainerSpec> {
        let block = self.block(id)?;
        self.registry
            .get(&block.type_name)
            .and_then(|def| def.container.clone())
            .ok_or(EditorError::NotVariadic(id))
    }

    pub fn container_kind(&self, id: BlockId) -> EditorResult<ContainerKind> {
        self.block(id)?.container.ok_or(EditorError::NotVariadic(id))
    }

    // ---- lifecycle ----

    /// Instantiate a top-level block of `type_name` at the origin.
    pub fn new_block(&mut self, type_name: &str) -> EditorResult<BlockId> {
        let def = self
            .registry
            .get(type_name)
            .cloned()
            .ok_or_else(|| EditorError::UnknownBlockType(type_name.to_string()))?;

        let id = self.ids.alloc_block();
        let output = def
            .output
            .map(|spec| self.add_connection(id, ConnectionType::OutputValue, spec.check));
        let previous = def
            .previous
            .map(|spec| self.add_connection(id, ConnectionType::PreviousStatement, spec.check));
        let next = def
            .next
            .map(|spec| self.add_connection(id, ConnectionType::NextStatement, spec.check));

        self.blocks.insert(
            id,
            Block {
                id,
                type_name: def.type_name.clone(),
                container: def.container.as_ref().map(|c| c.kind),
                slot_count: 0,
                inputs: Vec::new(),
                output,
                previous,
                next,
                shadow: false,
                movable: true,
                in_flyout: false,
                dragging: false,
                xy: Coordinate::ORIGIN,
                duplicate_on_drag: None,
            },
        );
        self.top_blocks.push(id);
        for template in def.inputs {
            self.append_input(id, template)?;
        }
        self.events.fire(BlockEvent::Create {
            block: id,
            type_name: def.type_name.clone(),
        });

        if let Some(spec) = &def.container {
            variadic::init(self, id, spec)?;
            if spec.kind == ContainerKind::Call {
                let name = self
                    .block(id)?
                    .field_value(CALL_NAME_FIELD)
                    .unwrap_or_default()
                    .to_string();
                self.procedures.register(&name, id);
            }
        }
        log::debug!("created {} {}", def.type_name, id);
        Ok(id)
    }

    pub fn new_shadow_block(&mut self, type_name: &str) -> EditorResult<BlockId> {
        let id = self.new_block(type_name)?;
        self.set_shadow(id, true)?;
        Ok(id)
    }

    /// Dispose `id` and everything attached below it. The input it vacates
    /// gets its placeholder back.
    pub fn dispose_block(&mut self, id: BlockId) -> EditorResult<()> {
        let parent_end = self.parent_connection(id)?;
        if let Some(parent_end) = parent_end {
            self.disconnect_inner(parent_end, false)?;
        }
        self.dispose_subtree(id);
        if let Some(parent_end) = parent_end {
            self.respawn_shadow(parent_end)?;
        }
        Ok(())
    }

    /// Remove `id` and its children without touching whatever it was plugged into
    /// beyond clearing the link.
    pub(crate) fn dispose_subtree(&mut self, id: BlockId) {
        let mut dead = Graveyard::default();
        self.bury_subtree(id, &mut dead);
        self.purge(&dead);
    }

    /// Drop `id` and its children from the arena, children first, recording
    /// what [`Workspace::purge`] still has to unlink.
    fn bury_subtree(&mut self, id: BlockId, dead: &mut Graveyard) {
        let children = self.children(id).unwrap_or_default();
        for child in children {
            self.bury_subtree(child, dead);
        }
        let Some(block) = self.blocks.remove(&id) else {
            return;
        };
        dead.connections.extend(block.connections());
        dead.blocks.insert(id);
        if block.container == Some(ContainerKind::Call) {
            self.procedures.deregister(id);
        }
        self.events.fire(BlockEvent::Delete { block: id });
        log::debug!("disposed {} {}", block.type_name, id);
    }

    /// Remove buried connections in one pass and clear links that pointed at
    /// them from survivors.
    fn purge(&mut self, dead: &Graveyard) {
        if dead.connections.is_empty() && dead.blocks.is_empty() {
            return;
        }
        for conn in &dead.connections {
            let Some(target) = self.connections.get(conn).and_then(|c| c.target) else {
                continue;
            };
            if dead.connections.contains(&target) {
                continue;
            }
            if let Some(other) = self.connections.get_mut(&target) {
                other.target = None;
            }
        }
        self.connections.retain(|id, _| !dead.connections.contains(id));
        self.top_blocks.retain(|b| !dead.blocks.contains(b));
    }

    pub fn set_field(&mut self, id: BlockId, name: &str, value: &str) -> EditorResult<()> {
        let block = self.block_mut(id)?;
        let slot = block
            .inputs
            .iter_mut()
            .flat_map(|i| i.fields.iter_mut())
            .find_map(|f| match f {
                Field::Text { name: n, value } if n == name => Some(value),
                _ => None,
            });
        match slot {
            Some(slot) => *slot = value.to_string(),
            None => {
                return Err(EditorError::UnknownInput {
                    block: id,
                    name: name.to_string(),
                })
            }
        }
        if block.container == Some(ContainerKind::Call) && name == CALL_NAME_FIELD {
            self.procedures.register(value, id);
        }
        Ok(())
    }

    pub fn set_shadow(&mut self, id: BlockId, shadow: bool) -> EditorResult<()> {
        self.block_mut(id)?.shadow = shadow;
        Ok(())
    }

    pub fn set_movable(&mut self, id: BlockId, movable: bool) -> EditorResult<()> {
        self.block_mut(id)?.movable = movable;
        Ok(())
    }

    pub fn set_in_flyout(&mut self, id: BlockId, in_flyout: bool) -> EditorResult<()> {
        self.block_mut(id)?.in_flyout = in_flyout;
        Ok(())
    }

    pub fn set_duplicate_override(&mut self, id: BlockId, value: Option<bool>) -> EditorResult<()> {
        self.block_mut(id)?.duplicate_on_drag = value;
        Ok(())
    }

    pub(crate) fn set_dragging(&mut self, id: BlockId, dragging: bool) -> EditorResult<()> {
        for b in self.descendants(id)? {
            self.block_mut(b)?.dragging = dragging;
        }
        Ok(())
    }

    /// Store the placeholder template for an input and spawn it when the
    /// input is empty. Returns the spawned placeholder, if any.
    pub fn set_shadow_state(
        &mut self,
        conn: ConnectionId,
        state: Option<BlockState>,
    ) -> EditorResult<Option<BlockId>> {
        self.connection_mut(conn)?.shadow_state = state.map(Box::new);
        self.respawn_shadow(conn)
    }

    // ---- tree queries ----

    /// Block on the other end of `conn`.
    pub fn connected_block(&self, conn: ConnectionId) -> EditorResult<Option<BlockId>> {
        match self.connection(conn)?.target {
            Some(target) => Ok(Some(self.connection(target)?.block)),
            None => Ok(None),
        }
    }

    /// The parent's superior end `id` is plugged into.
    pub fn parent_connection(&self, id: BlockId) -> EditorResult<Option<ConnectionId>> {
        let block = self.block(id)?;
        for conn in [block.output, block.previous].into_iter().flatten() {
            if let Some(target) = self.connection(conn)?.target {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }

    pub fn parent(&self, id: BlockId) -> EditorResult<Option<BlockId>> {
        match self.parent_connection(id)? {
            Some(conn) => Ok(Some(self.connection(conn)?.block)),
            None => Ok(None),
        }
    }

    /// Name of the parent input holding `id`; `None` when top-level or stacked
    /// under the parent's next connection.
    pub fn parent_input_name(&self, id: BlockId) -> EditorResult<Option<String>> {
        let Some(conn) = self.parent_connection(id)? else {
            return Ok(None);
        };
        let parent = self.block(self.connection(conn)?.block)?;
        Ok(parent
            .inputs
            .iter()
            .find(|i| i.connection == Some(conn))
            .map(|i| i.name.clone()))
    }

    /// Blocks attached to the inputs of `id`, then its next block.
    pub fn children(&self, id: BlockId) -> EditorResult<Vec<BlockId>> {
        let block = self.block(id)?;
        let mut out = Vec::new();
        let sockets = block
            .inputs
            .iter()
            .filter_map(|i| i.connection)
            .chain(block.next);
        for conn in sockets {
            if let Some(child) = self.connected_block(conn)? {
                out.push(child);
            }
        }
        Ok(out)
    }

    /// `id` followed by every block below it, depth first.
    pub fn descendants(&self, id: BlockId) -> EditorResult<Vec<BlockId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current)?.into_iter().rev());
        }
        Ok(out)
    }

    pub fn root_block(&self, id: BlockId) -> EditorResult<BlockId> {
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    pub fn next_block(&self, id: BlockId) -> EditorResult<Option<BlockId>> {
        match self.block(id)?.next {
            Some(next) => self.connected_block(next),
            None => Ok(None),
        }
    }

    pub fn input_connection(&self, id: BlockId, name: &str) -> EditorResult<ConnectionId> {
        self.block(id)?
            .input(name)
            .and_then(|i| i.connection)
            .ok_or_else(|| EditorError::UnknownInput {
                block: id,
                name: name.to_string(),
            })
    }

    pub fn input_names(&self, id: BlockId) -> EditorResult<Vec<String>> {
        Ok(self
            .block(id)?
            .inputs
            .iter()
            .map(|i| i.name.clone())
            .collect())
    }

    // ---- input editing ----

    /// Push a fully built input onto the end of the block's input list.
    pub(crate) fn append_input(&mut self, id: BlockId, template: InputTemplate) -> EditorResult<()> {
        self.push_input(id, template)?;
        self.relayout(id)
    }

    /// [`Workspace::append_input`] without the relayout, for batches that
    /// lay the block out once at the end.
    pub(crate) fn push_input(&mut self, id: BlockId, template: InputTemplate) -> EditorResult<()> {
        self.block(id)?;
        let kind = match template.kind {
            InputKind::Value => Some(ConnectionType::InputValue),
            InputKind::Statement => Some(ConnectionType::NextStatement),
            InputKind::Dummy => None,
        };
        let connection = kind.map(|k| self.add_connection(id, k, template.check));
        self.block_mut(id)?.inputs.push(Input {
            name: template.name,
            kind: template.kind,
            fields: template.fields,
            connection,
        });
        Ok(())
    }

    /// Remove the named input, disposing whatever is attached to it.
    /// Returns `false` when no such input exists.
    pub(crate) fn remove_input(&mut self, id: BlockId, name: &str) -> EditorResult<bool> {
        let block = self.block_mut(id)?;
        let Some(index) = block.input_index(name) else {
            return Ok(false);
        };
        let removed = block.inputs.remove(index);
        self.discard_inputs(vec![removed])?;
        self.relayout(id)?;
        Ok(true)
    }

    /// Drop every input from `len` onwards, disposing what they hold. The
    /// block is not laid out again; callers batching edits do that once.
    pub(crate) fn truncate_inputs(&mut self, id: BlockId, len: usize) -> EditorResult<()> {
        let block = self.block_mut(id)?;
        if len >= block.inputs.len() {
            return Ok(());
        }
        let removed = block.inputs.split_off(len);
        self.discard_inputs(removed)
    }

    fn discard_inputs(&mut self, removed: Vec<Input>) -> EditorResult<()> {
        let mut dead = Graveyard::default();
        for conn in removed.into_iter().filter_map(|i| i.connection) {
            if let Some(child) = self.connected_block(conn)? {
                self.events.fire(BlockEvent::Disconnect {
                    parent: conn,
                    child,
                });
                self.bury_subtree(child, &mut dead);
            }
            dead.connections.insert(conn);
        }
        self.purge(&dead);
        Ok(())
    }

    fn add_connection(
        &mut self,
        block: BlockId,
        kind: ConnectionType,
        check: Option<Vec<String>>,
    ) -> ConnectionId {
        let id = self.ids.alloc_connection();
        self.connections.insert(
            id,
            Connection {
                id,
                block,
                kind,
                offset: Coordinate::ORIGIN,
                check,
                target: None,
                shadow_state: None,
            },
        );
        id
    }
}
