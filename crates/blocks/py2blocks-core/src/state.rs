//! Serializable snapshots of a block subtree.
//!
//! A [`BlockState`] is what duplicate-on-drag clones from and what an input
//! keeps as its placeholder template. It is not a document format: only the
//! pieces needed to rebuild an equivalent block are captured.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{ConnectionType, Field};
use crate::error::{EditorError, EditorResult};
use crate::ids::{BlockId, ConnectionId};
use crate::variadic;
use crate::workspace::Workspace;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub shadow: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(
        rename = "extraState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extra_state: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<BlockState>>,
    #[serde(
        rename = "duplicateOnDrag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duplicate_on_drag: Option<bool>,
}

/// Contents of one input: the attached real block and/or its placeholder template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Box<BlockState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Box<BlockState>>,
}

impl BlockState {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            shadow: false,
            fields: BTreeMap::new(),
            extra_state: None,
            inputs: BTreeMap::new(),
            next: None,
            duplicate_on_drag: None,
        }
    }

    pub fn shadow(type_name: impl Into<String>) -> Self {
        Self {
            shadow: true,
            ..Self::new(type_name)
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_extra_state(mut self, extra: Value) -> Self {
        self.extra_state = Some(extra);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, input: InputState) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }
}

impl Workspace {
    /// Snapshot `id` and everything attached below it.
    pub fn save_block(&self, id: BlockId) -> EditorResult<BlockState> {
        let block = self.block(id)?;
        let mut state = BlockState::new(block.type_name.clone());
        state.shadow = block.shadow;
        state.duplicate_on_drag = block.duplicate_on_drag;
        for field in block.inputs.iter().flat_map(|i| i.fields.iter()) {
            if let Field::Text { name, value } = field {
                state.fields.insert(name.clone(), value.clone());
            }
        }
        if block.is_container() {
            state.extra_state = Some(variadic::save_extra_state(self, id)?);
        }

        for input in &block.inputs {
            let Some(conn_id) = input.connection else {
                continue;
            };
            let conn = self.connection(conn_id)?;
            let mut input_state = InputState {
                block: None,
                shadow: conn.shadow_state.clone(),
            };
            if let Some(child) = self.connected_block(conn_id)? {
                let child_state = self.save_block(child)?;
                if child_state.shadow {
                    input_state.shadow = Some(Box::new(child_state));
                } else {
                    input_state.block = Some(Box::new(child_state));
                }
            }
            if input_state.block.is_some() || input_state.shadow.is_some() {
                state.inputs.insert(input.name.clone(), input_state);
            }
        }

        if let Some(next) = block.next {
            if let Some(child) = self.connected_block(next)? {
                state.next = Some(Box::new(self.save_block(child)?));
            }
        }
        Ok(state)
    }

    /// Build a new top-level block tree from `state`.
    ///
    /// Extra state is applied before any child is attached, so the inputs a
    /// child refers to exist by the time it is connected.
    pub fn restore_block(&mut self, state: &BlockState) -> EditorResult<BlockId> {
        let id = self.new_block(&state.type_name)?;
        if state.shadow {
            self.set_shadow(id, true)?;
        }
        if let Some(extra) = &state.extra_state {
            if self.block(id)?.is_container() {
                variadic::load_extra_state(self, id, extra)?;
            }
        }
        for (name, value) in &state.fields {
            self.set_field(id, name, value)?;
        }
        self.set_duplicate_override(id, state.duplicate_on_drag)?;

        let inputs: Vec<(String, Option<ConnectionId>)> = self
            .block(id)?
            .inputs
            .iter()
            .map(|i| (i.name.clone(), i.connection))
            .collect();
        for (name, conn) in inputs {
            let (Some(input_state), Some(conn)) = (state.inputs.get(&name), conn) else {
                continue;
            };
            self.connection_mut(conn)?.shadow_state = input_state.shadow.clone();
            match &input_state.block {
                Some(child_state) => {
                    let child = self.restore_block(child_state)?;
                    self.attach_child(conn, child)?;
                }
                None => {
                    self.respawn_shadow(conn)?;
                }
            }
        }

        if let Some(next_state) = &state.next {
            let next_conn = self.block(id)?.next.ok_or_else(|| EditorError::UnknownInput {
                block: id,
                name: "next".to_string(),
            })?;
            let child = self.restore_block(next_state)?;
            self.attach_child(next_conn, child)?;
        }
        Ok(id)
    }

    /// Plug `child` into the superior end `socket` using whichever of its
    /// connections fits.
    pub(crate) fn attach_child(&mut self, socket: ConnectionId, child: BlockId) -> EditorResult<()> {
        let wanted = self.connection(socket)?.kind.opposite();
        let block = self.block(child)?;
        let plug = match wanted {
            ConnectionType::OutputValue => block.output,
            ConnectionType::PreviousStatement => block.previous,
            _ => None,
        };
        let plug = plug.ok_or(EditorError::MissingConnection {
            block: child,
            target: socket,
        })?;
        self.connect(socket, plug)
    }
}
