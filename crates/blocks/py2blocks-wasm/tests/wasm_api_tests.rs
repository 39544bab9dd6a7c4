#![cfg(target_arch = "wasm32")]
use serde_json::Value;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use py2blocks_wasm::{abi_version, get_block_definitions_json, WasmEditor};

wasm_bindgen_test_configure!(run_in_browser);

fn parse(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

#[wasm_bindgen_test]
fn abi_is_1() {
    assert_eq!(abi_version(), 1);
}

#[wasm_bindgen_test]
fn construct_with_defaults_or_json() {
    assert!(WasmEditor::new(JsValue::UNDEFINED).is_ok());
    assert!(WasmEditor::new(JsValue::from_str(r#"{ "snap_radius": 30 }"#)).is_ok());
    assert!(WasmEditor::new(JsValue::from_str(r#"{ "snap_radius": -1 }"#)).is_err());
}

#[wasm_bindgen_test]
fn definitions_list_containers() {
    let defs = get_block_definitions_json().unwrap();
    assert!(defs.contains("\"ListComp\""));
}

#[wasm_bindgen_test]
fn controls_round_trip_through_json() {
    let mut editor = WasmEditor::new(JsValue::NULL).unwrap();
    let list = editor.create_block("List").unwrap();
    editor.press_control(list, "add").unwrap();
    editor.press_control(list, "add").unwrap();
    assert_eq!(parse(&editor.save_extra_state(list).unwrap())["items"], 2);
    assert_eq!(
        parse(&editor.available_controls(list).unwrap()),
        serde_json::json!(["add", "remove"])
    );

    assert_eq!(editor.load_extra_state(list, r#"{ "items": "5" }"#).unwrap(), 5);
    assert_eq!(parse(&editor.block_json(list).unwrap())["items"], 5);
}

#[wasm_bindgen_test]
fn drag_into_socket_reports_connection() {
    let mut editor = WasmEditor::new(JsValue::NULL).unwrap();
    let ret = editor.create_block("Return").unwrap();
    let int = editor.create_block("int").unwrap();
    editor.move_block(int, 500.0, 500.0).unwrap();

    assert_eq!(editor.start_drag(int, false).unwrap(), int);
    let candidate = parse(&editor.drag(40.0, 0.0).unwrap());
    assert_eq!(
        candidate["neighbour"],
        editor.input_connection(ret, "value").unwrap()
    );
    let outcome = parse(&editor.end_drag(40.0, 0.0).unwrap());
    assert_eq!(outcome["outcome"], "connected");
    assert!(!editor.is_dragging());

    assert_eq!(editor.flush_layout(), 1);
    assert_eq!(editor.next_tick(), 1);
    let commands = parse(&editor.drain_commands().unwrap());
    let last = commands.as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["command"], "bring_to_front");
    assert_eq!(parse(&editor.block_json(int).unwrap())["parent"], ret);
}
