//! wasm-bindgen facade over `py2blocks-core`.
//!
//! Ids cross the boundary as plain `u32`s. Structured values cross as JSON
//! strings, except the constructor config, which may also be a plain object.
//! Visual requests are buffered and handed to JS through
//! [`WasmEditor::drain_commands`].

use py2blocks_core::{
    variadic, BlockId, BlockRegistry, BlockState, ConnectionId, ControlAction, Coordinate,
    DragStrategy, EditorConfig, Field, InputKind, RecordingHost, Workspace,
};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// Bumped whenever a method signature or JSON shape changes.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}

/// Built-in block definitions as JSON, for palettes and tooling.
#[wasm_bindgen]
pub fn get_block_definitions_json() -> Result<String, JsValue> {
    serde_json::to_string(&BlockRegistry::builtin()).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_err(err: impl ToString) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_action(action: &str) -> Result<ControlAction, String> {
    match action.trim().to_ascii_lowercase().as_str() {
        "add" | "+" => Ok(ControlAction::Add),
        "remove" | "-" => Ok(ControlAction::Remove),
        other => Err(format!("unknown control action '{other}'")),
    }
}

fn parse_config(raw: &str) -> Result<EditorConfig, String> {
    if raw.trim().is_empty() {
        return Ok(EditorConfig::default());
    }
    serde_json::from_str(raw).map_err(|e| format!("invalid editor config: {e}"))
}

/// View of one block for the host's renderer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockView<'a> {
    id: u32,
    #[serde(rename = "type")]
    type_name: &'a str,
    x: f64,
    y: f64,
    shadow: bool,
    movable: bool,
    items: usize,
    output: Option<u32>,
    previous: Option<u32>,
    next: Option<u32>,
    next_block: Option<u32>,
    parent: Option<u32>,
    inputs: Vec<InputView<'a>>,
}

#[derive(Debug, Serialize)]
struct InputView<'a> {
    name: &'a str,
    kind: &'static str,
    fields: &'a [Field],
    connection: Option<u32>,
    child: Option<u32>,
}

fn block_view(ws: &Workspace, id: BlockId) -> Result<BlockView<'_>, String> {
    let block = ws.block(id).map_err(|e| e.to_string())?;
    let mut inputs = Vec::with_capacity(block.inputs.len());
    for input in &block.inputs {
        let child = match input.connection {
            Some(conn) => ws
                .connected_block(conn)
                .map_err(|e| e.to_string())?
                .map(|b| b.0),
            None => None,
        };
        let kind = match input.kind {
            InputKind::Value => "value",
            InputKind::Statement => "statement",
            InputKind::Dummy => "dummy",
        };
        inputs.push(InputView {
            name: &input.name,
            kind,
            fields: &input.fields,
            connection: input.connection.map(|c| c.0),
            child,
        });
    }
    Ok(BlockView {
        id: id.0,
        type_name: &block.type_name,
        x: block.xy.x,
        y: block.xy.y,
        shadow: block.shadow,
        movable: block.movable,
        items: block.slot_count,
        output: block.output.map(|c| c.0),
        previous: block.previous.map(|c| c.0),
        next: block.next.map(|c| c.0),
        next_block: ws.next_block(id).map_err(|e| e.to_string())?.map(|b| b.0),
        parent: ws.parent(id).map_err(|e| e.to_string())?.map(|b| b.0),
        inputs,
    })
}

/// One editor workspace plus its drag gesture and buffered host commands.
#[wasm_bindgen]
pub struct WasmEditor {
    ws: Workspace,
    drag: DragStrategy,
    host: RecordingHost,
}

#[wasm_bindgen]
impl WasmEditor {
    /// `config` may be undefined/null (defaults), a JSON string or an object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmEditor, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let config = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else if let Some(raw) = config.as_string() {
            parse_config(&raw).map_err(js_err)?
        } else {
            serde_wasm_bindgen::from_value(config).map_err(js_err)?
        };
        let ws = Workspace::new(config, BlockRegistry::builtin()).map_err(js_err)?;
        Ok(WasmEditor {
            ws,
            drag: DragStrategy::new(),
            host: RecordingHost::new(),
        })
    }

    // ── blocks ──────────────────────────────────────────────────────────────

    #[wasm_bindgen]
    pub fn create_block(&mut self, type_name: &str) -> Result<u32, JsValue> {
        self.ws.new_block(type_name).map(|b| b.0).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn dispose_block(&mut self, id: u32) -> Result<(), JsValue> {
        self.ws.dispose_block(BlockId(id)).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn move_block(&mut self, id: u32, x: f64, y: f64) -> Result<(), JsValue> {
        self.ws
            .move_to(BlockId(id), Coordinate::new(x, y), "host")
            .map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn set_field(&mut self, id: u32, name: &str, value: &str) -> Result<(), JsValue> {
        self.ws.set_field(BlockId(id), name, value).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn connect(&mut self, a: u32, b: u32) -> Result<(), JsValue> {
        self.ws
            .connect(ConnectionId(a), ConnectionId(b))
            .map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn input_connection(&self, id: u32, name: &str) -> Result<u32, JsValue> {
        self.ws
            .input_connection(BlockId(id), name)
            .map(|c| c.0)
            .map_err(js_err)
    }

    /// Snapshot of one block, see `block_view` for the shape.
    #[wasm_bindgen]
    pub fn block_json(&self, id: u32) -> Result<String, JsValue> {
        let view = block_view(&self.ws, BlockId(id)).map_err(js_err)?;
        serde_json::to_string(&view).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn top_blocks(&self) -> js_sys::Uint32Array {
        let ids: Vec<u32> = self.ws.top_blocks().iter().map(|b| b.0).collect();
        js_sys::Uint32Array::from(ids.as_slice())
    }

    #[wasm_bindgen]
    pub fn save_block(&self, id: u32) -> Result<String, JsValue> {
        let state = self.ws.save_block(BlockId(id)).map_err(js_err)?;
        serde_json::to_string(&state).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn restore_block(&mut self, state_json: &str) -> Result<u32, JsValue> {
        let state: BlockState = serde_json::from_str(state_json).map_err(js_err)?;
        self.ws.restore_block(&state).map(|b| b.0).map_err(js_err)
    }

    // ── variadic shapes ─────────────────────────────────────────────────────

    #[wasm_bindgen]
    pub fn set_slot_count(&mut self, id: u32, count: u32) -> Result<(), JsValue> {
        variadic::set_slot_count(&mut self.ws, BlockId(id), count as usize).map_err(js_err)
    }

    /// `action` is `"add"` or `"remove"`.
    #[wasm_bindgen]
    pub fn press_control(&mut self, id: u32, action: &str) -> Result<(), JsValue> {
        let action = parse_action(action).map_err(js_err)?;
        variadic::press_control(&mut self.ws, BlockId(id), action).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn available_controls(&self, id: u32) -> Result<String, JsValue> {
        let controls = variadic::available_controls(&self.ws, BlockId(id)).map_err(js_err)?;
        serde_json::to_string(&controls).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn save_extra_state(&self, id: u32) -> Result<String, JsValue> {
        let state = variadic::save_extra_state(&self.ws, BlockId(id)).map_err(js_err)?;
        serde_json::to_string(&state).map_err(js_err)
    }

    /// Returns the slot count actually applied after normalization.
    #[wasm_bindgen]
    pub fn load_extra_state(&mut self, id: u32, state_json: &str) -> Result<u32, JsValue> {
        let state: Value = serde_json::from_str(state_json).map_err(js_err)?;
        let applied =
            variadic::load_extra_state(&mut self.ws, BlockId(id), &state).map_err(js_err)?;
        Ok(applied as u32)
    }

    // ── drag ────────────────────────────────────────────────────────────────

    /// Returns the id of the block actually dragged.
    #[wasm_bindgen]
    pub fn start_drag(&mut self, id: u32, heal_stack: bool) -> Result<u32, JsValue> {
        self.drag
            .start_drag(&mut self.ws, &mut self.host, BlockId(id), heal_stack)
            .map(|b| b.0)
            .map_err(js_err)
    }

    /// Returns the held candidate as JSON, or `"null"`.
    #[wasm_bindgen]
    pub fn drag(&mut self, x: f64, y: f64) -> Result<String, JsValue> {
        let candidate = self
            .drag
            .drag(&self.ws, &mut self.host, Coordinate::new(x, y))
            .map_err(js_err)?;
        serde_json::to_string(&candidate).map_err(js_err)
    }

    /// Returns the drag outcome as JSON.
    #[wasm_bindgen]
    pub fn end_drag(&mut self, x: f64, y: f64) -> Result<String, JsValue> {
        let outcome = self
            .drag
            .end_drag(&mut self.ws, &mut self.host, Coordinate::new(x, y))
            .map_err(js_err)?;
        serde_json::to_string(&outcome).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn revert_drag(&mut self) -> Result<(), JsValue> {
        self.drag
            .revert_drag(&mut self.ws, &mut self.host)
            .map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn is_dragging(&self) -> bool {
        self.drag.session().is_some()
    }

    // ── host plumbing ───────────────────────────────────────────────────────

    /// Call after the host finished rendering queued blocks.
    #[wasm_bindgen]
    pub fn flush_layout(&mut self) -> u32 {
        self.ws.flush_layout(&mut self.host) as u32
    }

    #[wasm_bindgen]
    pub fn next_tick(&mut self) -> u32 {
        self.ws.run_next_tick(&mut self.host) as u32
    }

    /// Visual requests recorded since the last drain, oldest first.
    #[wasm_bindgen]
    pub fn drain_commands(&mut self) -> Result<String, JsValue> {
        let commands = self.host.drain();
        log::trace!("draining {} host commands", commands.len());
        serde_json::to_string(&commands).map_err(js_err)
    }

    /// Block events since the last call. Poll after each operation: once
    /// `event_log_capacity` events are pending, the oldest are dropped.
    #[wasm_bindgen]
    pub fn drain_events(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.ws.events.drain()).map_err(js_err)
    }
}
