//! Block definitions and the registry blocks are instantiated from.
//!
//! The registry is plain configuration handed to a [`Workspace`](crate::Workspace);
//! nothing here is process-global.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::block::{Field, InputKind};

/// Check attached to the slots of mapping containers.
pub const DICT_SLOT_CHECK: [&str; 2] = ["dict_item", "dict_unpack"];

/// Variadic container kinds. Kind-specific behaviour lives in matched branches
/// here and in [`variadic`](crate::variadic).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerKind {
    List,
    Tuple,
    Set,
    Dict,
    Delete,
    Call,
    Comprehension { has_if: bool },
}

impl ContainerKind {
    /// Input name prefixes making up one variadic unit.
    pub fn group_prefixes(self) -> &'static [&'static str] {
        match self {
            ContainerKind::Comprehension { has_if: true } => &["target", "iter", "if"],
            ContainerKind::Comprehension { has_if: false } => &["target", "iter"],
            _ => &["input"],
        }
    }

    pub fn group_size(self) -> usize {
        self.group_prefixes().len()
    }

    /// Check applied to every slot at creation.
    pub fn slot_check(self) -> Option<Vec<String>> {
        match self {
            ContainerKind::Dict => Some(DICT_SLOT_CHECK.iter().map(|s| s.to_string()).collect()),
            _ => None,
        }
    }

    pub fn is_comprehension(self) -> bool {
        matches!(self, ContainerKind::Comprehension { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub kind: ContainerKind,
    pub open_with: String,
    pub close_with: String,
    /// Check on the leading `elt` input of comprehensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elt_check: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputTemplate {
    pub name: String,
    pub kind: InputKind,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Vec<String>>,
}

/// Presence of a connection and its optional check. `Some(None)` would be
/// ambiguous, so connections use this wrapper.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub type_name: String,
    pub category: String,
    pub colour: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<ConnectionSpec>,
    #[serde(default)]
    pub inputs: Vec<InputTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSpec>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockRegistry {
    definitions: HashMap<String, BlockDefinition>,
}

impl BlockRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the container blocks and the leaf/statement blocks the
    /// editor palette needs.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        for def in builtin_definitions() {
            reg.register(def);
        }
        reg
    }

    /// Insert or replace a definition.
    pub fn register(&mut self, def: BlockDefinition) {
        self.definitions.insert(def.type_name.clone(), def);
    }

    pub fn get(&self, type_name: &str) -> Option<&BlockDefinition> {
        self.definitions.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    /// Type names in sorted order.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

// Palette colours
const COLLECTIONS: &str = "#ff9966";
const FUNCTIONS: &str = "#ff99aa";
const VARIABLES: &str = "#ffa54c";
const LOGIC: &str = "#98b8d8";
const MATH: &str = "#97a2d8";

fn checked(types: &[&str]) -> Option<Vec<String>> {
    Some(types.iter().map(|s| s.to_string()).collect())
}

fn output(types: Option<&[&str]>) -> Option<ConnectionSpec> {
    Some(ConnectionSpec {
        check: types.and_then(checked),
    })
}

fn statement() -> Option<ConnectionSpec> {
    Some(ConnectionSpec::default())
}

fn value_in(name: &str, fields: Vec<Field>) -> InputTemplate {
    InputTemplate {
        name: name.to_string(),
        kind: InputKind::Value,
        fields,
        check: None,
    }
}

fn dummy(name: &str, fields: Vec<Field>) -> InputTemplate {
    InputTemplate {
        name: name.to_string(),
        kind: InputKind::Dummy,
        fields,
        check: None,
    }
}

fn leaf(type_name: &str, category: &str, colour: &str) -> BlockDefinition {
    BlockDefinition {
        type_name: type_name.to_string(),
        category: category.to_string(),
        colour: colour.to_string(),
        output: None,
        previous: None,
        next: None,
        inputs: Vec::new(),
        container: None,
    }
}

fn container(type_name: &str, kind: ContainerKind, open: &str, close: &str) -> BlockDefinition {
    let statement_like = matches!(kind, ContainerKind::Delete);
    BlockDefinition {
        output: if statement_like {
            None
        } else {
            output(Some(&["value"]))
        },
        previous: if statement_like { statement() } else { None },
        next: if statement_like { statement() } else { None },
        container: Some(ContainerSpec {
            kind,
            open_with: open.to_string(),
            close_with: close.to_string(),
            elt_check: None,
        }),
        ..leaf(type_name, "Collections", COLLECTIONS)
    }
}

fn builtin_definitions() -> Vec<BlockDefinition> {
    use ContainerKind::*;
    let mut defs = vec![
        container("List", List, "[", "]"),
        container("Tuple", Tuple, "(", ")"),
        container("Set", Set, "{", "}"),
        container("Dict", Dict, "{", "}"),
        container("Delete", Delete, "del", ""),
        BlockDefinition {
            category: "Functions".to_string(),
            colour: FUNCTIONS.to_string(),
            ..container("Call", Call, "(", ")")
        },
        container("ListComp", Comprehension { has_if: true }, "[", "]"),
        container("SetComp", Comprehension { has_if: true }, "{", "}"),
        container("GeneratorExp", Comprehension { has_if: true }, "(", ")"),
    ];

    let mut dict_comp = container("DictComp", Comprehension { has_if: false }, "{", "}");
    if let Some(spec) = dict_comp.container.as_mut() {
        spec.elt_check = checked(&["dict_item"]);
    }
    defs.push(dict_comp);

    defs.push(BlockDefinition {
        output: output(Some(&["dict_item"])),
        inputs: vec![
            value_in("key", vec![]),
            value_in("value", vec![Field::label(":")]),
        ],
        ..leaf("dict_item", "Collections", COLLECTIONS)
    });
    defs.push(BlockDefinition {
        output: output(Some(&["dict_unpack"])),
        inputs: vec![value_in("value", vec![Field::label("**")])],
        ..leaf("dict_unpack", "Collections", COLLECTIONS)
    });

    defs.push(BlockDefinition {
        output: output(Some(&["int"])),
        inputs: vec![dummy("", vec![Field::text("value", "0")])],
        ..leaf("int", "Math", "#ffffff")
    });
    defs.push(BlockDefinition {
        output: output(Some(&["str"])),
        inputs: vec![dummy("", vec![Field::text("value", "")])],
        ..leaf("str", "Text", "#ffffff")
    });
    defs.push(BlockDefinition {
        output: output(Some(&["bool"])),
        inputs: vec![dummy("", vec![Field::text("value", "True")])],
        ..leaf("bool", "Logic", LOGIC)
    });
    defs.push(BlockDefinition {
        output: output(Some(&["Name"])),
        inputs: vec![dummy("", vec![Field::text("var", "x")])],
        ..leaf("Name", "Variables", VARIABLES)
    });
    defs.push(BlockDefinition {
        output: output(None),
        inputs: vec![
            value_in("left", vec![]),
            dummy("", vec![Field::text("op", "Add")]),
            value_in("right", vec![]),
        ],
        ..leaf("BinOp", "Math", MATH)
    });

    defs.push(BlockDefinition {
        previous: statement(),
        next: statement(),
        inputs: vec![
            dummy("", vec![Field::text("var", "x"), Field::text("op", "=")]),
            value_in("value", vec![]),
        ],
        ..leaf("Assign", "Variables", VARIABLES)
    });
    defs.push(BlockDefinition {
        previous: statement(),
        inputs: vec![value_in("value", vec![Field::label("return")])],
        ..leaf("Return", "Functions", FUNCTIONS)
    });
    defs.push(BlockDefinition {
        previous: statement(),
        inputs: vec![dummy("", vec![Field::label("pass")])],
        ..leaf("Pass", "Functions", FUNCTIONS)
    });
    defs.push(BlockDefinition {
        previous: statement(),
        next: statement(),
        inputs: vec![
            dummy("", vec![Field::label("print(")]),
            value_in("ARG0", vec![]),
            dummy("", vec![Field::label(")")]),
        ],
        ..leaf("print_block", "Text", "#5b80a5")
    });
    defs.push(BlockDefinition {
        previous: statement(),
        next: statement(),
        inputs: vec![
            dummy(
                "",
                vec![
                    Field::label("def"),
                    Field::text("name", "my_function"),
                    Field::label("():"),
                ],
            ),
            InputTemplate {
                name: "body".to_string(),
                kind: InputKind::Statement,
                fields: Vec::new(),
                check: None,
            },
        ],
        ..leaf("FunctionDef", "Functions", FUNCTIONS)
    });

    defs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_every_container_kind() {
        let reg = BlockRegistry::builtin();
        let kinds: Vec<ContainerKind> = reg
            .type_names()
            .into_iter()
            .filter_map(|n| reg.get(n).and_then(|d| d.container.as_ref()).map(|c| c.kind))
            .collect();
        for expected in [
            ContainerKind::List,
            ContainerKind::Tuple,
            ContainerKind::Set,
            ContainerKind::Dict,
            ContainerKind::Delete,
            ContainerKind::Call,
            ContainerKind::Comprehension { has_if: true },
            ContainerKind::Comprehension { has_if: false },
        ] {
            assert!(kinds.contains(&expected), "registry missing {expected:?}");
        }
    }

    #[test]
    fn delete_is_a_statement_container() {
        let reg = BlockRegistry::builtin();
        let del = reg.get("Delete").expect("Delete registered");
        assert!(del.output.is_none());
        assert!(del.previous.is_some() && del.next.is_some());
    }

    #[test]
    fn group_shapes() {
        assert_eq!(ContainerKind::List.group_size(), 1);
        assert_eq!(ContainerKind::Comprehension { has_if: true }.group_size(), 3);
        assert_eq!(
            ContainerKind::Comprehension { has_if: false }.group_prefixes(),
            &["target", "iter"]
        );
        assert_eq!(
            ContainerKind::Dict.slot_check(),
            Some(vec!["dict_item".to_string(), "dict_unpack".to_string()])
        );
        assert_eq!(ContainerKind::Set.slot_check(), None);
    }

    #[test]
    fn registry_serializes_for_tooling() {
        let reg = BlockRegistry::builtin();
        let json = serde_json::to_value(&reg).expect("serialize");
        assert!(json["definitions"]["List"]["container"]["open_with"] == "[");
    }
}
