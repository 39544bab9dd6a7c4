//! Variadic container shapes.
//!
//! A container's inputs are always laid out as
//! `open_with, [elt], <slots...>, close_with, controls`, where slots come in
//! groups of [`ContainerKind::group_size`] named `<prefix>_<NNNNNN>`.
//! Every operation leaves that layout intact; there is no observable state
//! with a partial group, a missing closing marker or stale controls.

use serde_json::Value;

use crate::block::{ControlAction, Field, InputKind};
use crate::error::{EditorError, EditorResult};
use crate::events::BlockEvent;
use crate::ids::BlockId;
use crate::schema::{ContainerKind, ContainerSpec, InputTemplate};
use crate::workspace::{Workspace, CALL_NAME_FIELD};

pub const OPEN_INPUT: &str = "open_with";
pub const CLOSE_INPUT: &str = "close_with";
pub const CONTROLS_INPUT: &str = "controls";
/// Leading element input of comprehensions.
pub const ELT_INPUT: &str = "elt";

/// Zero-padded width of slot positions.
pub const SLOT_INDEX_WIDTH: usize = 6;
/// Largest count representable in [`SLOT_INDEX_WIDTH`] digits.
pub const MAX_SLOT_COUNT: usize = 999_999;

/// `input_000001`, `target_000012`, ...
pub fn slot_name(prefix: &str, position: usize) -> String {
    format!("{prefix}_{position:0width$}", width = SLOT_INDEX_WIDTH)
}

fn slot_label(kind: ContainerKind, prefix: &str, position: usize) -> Option<&'static str> {
    if kind.is_comprehension() {
        return match prefix {
            "target" => Some("for"),
            "iter" => Some("in"),
            "if" => Some("if"),
            _ => None,
        };
    }
    (position > 1).then_some(",")
}

/// Build the fixed inputs of a freshly created container and give it an
/// empty, well-formed shape.
pub fn init(ws: &mut Workspace, block: BlockId, spec: &ContainerSpec) -> EditorResult<()> {
    let mut open_fields = Vec::new();
    if spec.kind == ContainerKind::Call {
        open_fields.push(Field::text(CALL_NAME_FIELD, ""));
    }
    open_fields.push(Field::label(spec.open_with.clone()));
    ws.append_input(
        block,
        InputTemplate {
            name: OPEN_INPUT.to_string(),
            kind: InputKind::Dummy,
            fields: open_fields,
            check: None,
        },
    )?;
    if spec.kind.is_comprehension() {
        ws.append_input(
            block,
            InputTemplate {
                name: ELT_INPUT.to_string(),
                kind: InputKind::Value,
                fields: Vec::new(),
                check: spec.elt_check.clone(),
            },
        )?;
    }
    set_slot_count(ws, block, 0)
}

/// Grow or shrink the container to `target` units, one whole unit at a time.
/// Slots beyond the target are removed together with whatever they hold.
///
/// Slots are added or cut at the tail in one batch and the block is laid out
/// once, so restoring a container at [`MAX_SLOT_COUNT`] stays linear.
pub fn set_slot_count(ws: &mut Workspace, block: BlockId, target: usize) -> EditorResult<()> {
    let spec = ws.container_spec(block)?;
    let target = if target > MAX_SLOT_COUNT {
        log::warn!("{block}: clamping slot count {target} to {MAX_SLOT_COUNT}");
        MAX_SLOT_COUNT
    } else {
        target
    };
    let old = ws.block(block)?.slot_count;

    ws.remove_input(block, CONTROLS_INPUT)?;
    ws.remove_input(block, CLOSE_INPUT)?;
    if target > old {
        for position in old + 1..=target {
            add_group(ws, block, spec.kind, position)?;
        }
    } else if target < old {
        remove_groups_from(ws, block, spec.kind, target + 1)?;
    }
    ws.block_mut(block)?.slot_count = target;

    let close_fields = if spec.close_with.is_empty() {
        Vec::new()
    } else {
        vec![Field::label(spec.close_with.clone())]
    };
    ws.push_input(
        block,
        InputTemplate {
            name: CLOSE_INPUT.to_string(),
            kind: InputKind::Dummy,
            fields: close_fields,
            check: None,
        },
    )?;
    recompute_controls(ws, block)?;

    if old != target {
        log::debug!("{block}: slot count {old} -> {target}");
        ws.events.fire(BlockEvent::Mutation {
            block,
            old_items: old,
            new_items: target,
        });
    }
    Ok(())
}

fn add_group(
    ws: &mut Workspace,
    block: BlockId,
    kind: ContainerKind,
    position: usize,
) -> EditorResult<()> {
    for prefix in kind.group_prefixes() {
        let fields = slot_label(kind, prefix, position)
            .map(|l| vec![Field::label(l)])
            .unwrap_or_default();
        ws.push_input(
            block,
            InputTemplate {
                name: slot_name(prefix, position),
                kind: InputKind::Value,
                fields,
                check: kind.slot_check(),
            },
        )?;
    }
    Ok(())
}

/// Cut every group from `position` to the tail. Expects the closing marker
/// and controls to be gone already.
fn remove_groups_from(
    ws: &mut Workspace,
    block: BlockId,
    kind: ContainerKind,
    position: usize,
) -> EditorResult<()> {
    let first = slot_name(kind.group_prefixes()[0], position);
    let index = ws
        .block(block)?
        .input_index(&first)
        .ok_or_else(|| EditorError::UnknownInput {
            block,
            name: first.clone(),
        })?;
    ws.truncate_inputs(block, index)
}

/// Replace the controls input: one add action, plus remove when more than one
/// unit exists.
pub fn recompute_controls(ws: &mut Workspace, block: BlockId) -> EditorResult<()> {
    let count = ws.block(block)?.slot_count;
    ws.remove_input(block, CONTROLS_INPUT)?;
    let mut fields = vec![Field::Action {
        action: ControlAction::Add,
    }];
    if count > 1 {
        fields.push(Field::Action {
            action: ControlAction::Remove,
        });
    }
    ws.append_input(
        block,
        InputTemplate {
            name: CONTROLS_INPUT.to_string(),
            kind: InputKind::Dummy,
            fields,
            check: None,
        },
    )
}

pub fn available_controls(ws: &Workspace, block: BlockId) -> EditorResult<Vec<ControlAction>> {
    ws.container_kind(block)?;
    Ok(ws
        .block(block)?
        .input(CONTROLS_INPUT)
        .map(|i| i.actions().collect())
        .unwrap_or_default())
}

/// Handle a press on one of the container's control affordances.
///
/// Add stays on display at [`MAX_SLOT_COUNT`] but is refused there before
/// anything changes.
pub fn press_control(ws: &mut Workspace, block: BlockId, action: ControlAction) -> EditorResult<()> {
    let kind = ws.container_kind(block)?;
    if !available_controls(ws, block)?.contains(&action) {
        return Err(EditorError::ControlUnavailable { block, action });
    }
    let count = ws.block(block)?.slot_count;
    if action == ControlAction::Add && count >= MAX_SLOT_COUNT {
        log::warn!("{block}: already at {MAX_SLOT_COUNT} slots; ignoring add");
        return Err(EditorError::ControlUnavailable { block, action });
    }
    match action {
        ControlAction::Add => {
            set_slot_count(ws, block, count + 1)?;
            if kind == ContainerKind::Dict {
                let item = ws.new_block("dict_item")?;
                let slot = ws.input_connection(block, &slot_name("input", count + 1))?;
                ws.attach_child(slot, item)?;
            }
            Ok(())
        }
        ControlAction::Remove => set_slot_count(ws, block, count - 1),
    }
}

/// Persisted shape: exactly `{"items": <count>}`.
pub fn save_extra_state(ws: &Workspace, block: BlockId) -> EditorResult<Value> {
    ws.container_kind(block)?;
    let items = ws.block(block)?.slot_count;
    Ok(serde_json::json!({ "items": items }))
}

/// Rebuild the shape from persisted state. Malformed counts are normalized,
/// never rejected. Returns the count applied.
pub fn load_extra_state(ws: &mut Workspace, block: BlockId, state: &Value) -> EditorResult<usize> {
    let items = normalize_item_count(state.get("items"));
    set_slot_count(ws, block, 0)?;
    set_slot_count(ws, block, items)?;
    Ok(items)
}

/// Coerce a persisted `items` value to a slot count.
///
/// Integers pass through. Strings take their leading integer, like a lenient
/// integer parse. Floats truncate toward zero. Negative, non-numeric or
/// missing values become 0, and counts above [`MAX_SLOT_COUNT`] clamp.
pub fn normalize_item_count(raw: Option<&Value>) -> usize {
    let parsed: Option<i128> = match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                return clamp_count(i128::from(u), raw);
            }
            if let Some(i) = n.as_i64() {
                Some(i128::from(i))
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc().clamp(-1.0, (MAX_SLOT_COUNT + 1) as f64) as i128)
            }
        }
        Some(Value::String(s)) => leading_integer(s),
        Some(_) => None,
    };
    match parsed {
        Some(n) => {
            log::warn!("coercing extra state items {:?} to {}", raw, n.max(0));
            clamp_count(n, raw)
        }
        None => {
            log::warn!("extra state items {raw:?} is not a count; using 0");
            0
        }
    }
}

fn clamp_count(n: i128, raw: Option<&Value>) -> usize {
    if n < 0 {
        log::warn!("negative extra state items {raw:?}; using 0");
        0
    } else if n > MAX_SLOT_COUNT as i128 {
        log::warn!("extra state items {raw:?} exceeds {MAX_SLOT_COUNT}; clamping");
        MAX_SLOT_COUNT
    } else {
        n as usize
    }
}

/// Leading optionally-signed decimal integer of `s`, ignoring leading
/// whitespace. Saturates instead of overflowing.
fn leading_integer(s: &str) -> Option<i128> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &digits[..digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len())];
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.bytes().fold(0i128, |acc, b| {
        acc.saturating_mul(10).saturating_add(i128::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::schema::BlockRegistry;
    use serde_json::json;

    fn workspace() -> Workspace {
        Workspace::new(EditorConfig::default(), BlockRegistry::builtin()).expect("workspace")
    }

    #[test]
    fn slot_names_are_zero_padded() {
        assert_eq!(slot_name("input", 1), "input_000001");
        assert_eq!(slot_name("if", 123_456), "if_123456");
    }

    #[test]
    fn new_container_is_well_formed() {
        let mut ws = workspace();
        let list = ws.new_block("List").expect("list");
        assert_eq!(
            ws.input_names(list).expect("names"),
            vec![OPEN_INPUT, CLOSE_INPUT, CONTROLS_INPUT]
        );
        assert_eq!(
            available_controls(&ws, list).expect("controls"),
            vec![ControlAction::Add]
        );
    }

    #[test]
    fn comprehension_groups_carry_keywords() {
        let mut ws = workspace();
        let comp = ws.new_block("ListComp").expect("comp");
        set_slot_count(&mut ws, comp, 1).expect("grow");
        let block = ws.block(comp).expect("comp");
        let labels: Vec<&str> = ["target_000001", "iter_000001", "if_000001"]
            .iter()
            .map(|n| block.input(n).expect("slot").labels().next().expect("label"))
            .collect();
        assert_eq!(labels, vec!["for", "in", "if"]);
        assert!(block.input(ELT_INPUT).is_some());
    }

    #[test]
    fn remove_is_rejected_when_not_offered() {
        let mut ws = workspace();
        let tuple = ws.new_block("Tuple").expect("tuple");
        press_control(&mut ws, tuple, ControlAction::Add).expect("add");
        assert_eq!(
            press_control(&mut ws, tuple, ControlAction::Remove),
            Err(EditorError::ControlUnavailable {
                block: tuple,
                action: ControlAction::Remove
            })
        );
        assert_eq!(ws.block(tuple).expect("tuple").slot_count, 1);
    }

    #[test]
    fn non_containers_are_rejected() {
        let mut ws = workspace();
        let int = ws.new_block("int").expect("int");
        assert_eq!(
            set_slot_count(&mut ws, int, 2),
            Err(EditorError::NotVariadic(int))
        );
        assert_eq!(save_extra_state(&ws, int), Err(EditorError::NotVariadic(int)));
    }

    #[test]
    fn shrinking_disposes_attached_children() {
        let mut ws = workspace();
        let set = ws.new_block("Set").expect("set");
        set_slot_count(&mut ws, set, 2).expect("grow");
        let int = ws.new_block("int").expect("int");
        let slot = ws.input_connection(set, "input_000002").expect("slot");
        ws.attach_child(slot, int).expect("attach");

        set_slot_count(&mut ws, set, 1).expect("shrink");
        assert!(ws.is_disposed(int));
    }

    #[test]
    fn mutation_event_reports_old_and_new_counts() {
        let mut ws = workspace();
        let list = ws.new_block("List").expect("list");
        ws.events.drain();
        set_slot_count(&mut ws, list, 3).expect("grow");
        set_slot_count(&mut ws, list, 3).expect("same");
        let mutations: Vec<_> = ws
            .events
            .events()
            .iter()
            .filter_map(|e| match e.event {
                BlockEvent::Mutation {
                    old_items,
                    new_items,
                    ..
                } => Some((old_items, new_items)),
                _ => None,
            })
            .collect();
        assert_eq!(mutations, vec![(0, 3)]);
    }

    #[test]
    fn normalize_handles_malformed_counts() {
        assert_eq!(normalize_item_count(Some(&json!(4))), 4);
        assert_eq!(normalize_item_count(Some(&json!("3"))), 3);
        assert_eq!(normalize_item_count(Some(&json!("  12abc"))), 12);
        assert_eq!(normalize_item_count(Some(&json!("abc"))), 0);
        assert_eq!(normalize_item_count(Some(&json!(2.9))), 2);
        assert_eq!(normalize_item_count(Some(&json!(-5))), 0);
        assert_eq!(normalize_item_count(Some(&json!("-2"))), 0);
        assert_eq!(normalize_item_count(Some(&json!(null))), 0);
        assert_eq!(normalize_item_count(None), 0);
        assert_eq!(normalize_item_count(Some(&json!([1]))), 0);
        assert_eq!(normalize_item_count(Some(&json!(5_000_000))), MAX_SLOT_COUNT);
        assert_eq!(
            normalize_item_count(Some(&json!("99999999999999999999999999999999999999999"))),
            MAX_SLOT_COUNT
        );
    }
}
