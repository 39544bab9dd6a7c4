//! Block, input and connection records owned by the [`Workspace`](crate::Workspace).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Coordinate;
use crate::ids::{BlockId, ConnectionId};
use crate::schema::ContainerKind;
use crate::state::BlockState;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    InputValue,
    OutputValue,
    NextStatement,
    PreviousStatement,
}

impl ConnectionType {
    /// The type this end plugs into.
    pub fn opposite(self) -> ConnectionType {
        match self {
            ConnectionType::InputValue => ConnectionType::OutputValue,
            ConnectionType::OutputValue => ConnectionType::InputValue,
            ConnectionType::NextStatement => ConnectionType::PreviousStatement,
            ConnectionType::PreviousStatement => ConnectionType::NextStatement,
        }
    }

    /// Superior ends belong to the parent side of a connection.
    pub fn is_superior(self) -> bool {
        matches!(
            self,
            ConnectionType::InputValue | ConnectionType::NextStatement
        )
    }

    /// Plugs are the ends a dragged block leads with.
    pub fn is_plug(self) -> bool {
        matches!(
            self,
            ConnectionType::OutputValue | ConnectionType::PreviousStatement
        )
    }
}

/// One connection end. Positions are `block.xy + offset`.
#[derive(Clone, Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub block: BlockId,
    pub kind: ConnectionType,
    pub offset: Coordinate,
    /// Accepted type names; `None` accepts anything.
    pub check: Option<Vec<String>>,
    pub target: Option<ConnectionId>,
    /// Placeholder template re-spawned whenever the input becomes empty.
    pub shadow_state: Option<Box<BlockState>>,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    /// Checks intersect, or at least one side accepts anything.
    pub fn checks_compatible(&self, other: &Connection) -> bool {
        match (&self.check, &other.check) {
            (Some(a), Some(b)) => a.iter().any(|t| b.contains(t)),
            _ => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Add,
    Remove,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::Add => f.write_str("add"),
            ControlAction::Remove => f.write_str("remove"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Field {
    Label { text: String },
    Text { name: String, value: String },
    Action { action: ControlAction },
}

impl Field {
    pub fn label(text: impl Into<String>) -> Self {
        Field::Label { text: text.into() }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Field::Text {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Value,
    Statement,
    Dummy,
}

#[derive(Clone, Debug)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    pub fields: Vec<Field>,
    /// Present for value and statement inputs.
    pub connection: Option<ConnectionId>,
}

impl Input {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| match f {
            Field::Label { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn actions(&self) -> impl Iterator<Item = ControlAction> + '_ {
        self.fields.iter().filter_map(|f| match f {
            Field::Action { action } => Some(*action),
            _ => None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Block {
    pub id: BlockId,
    pub type_name: String,
    pub container: Option<ContainerKind>,
    /// Number of variadic units; always 0 for non-containers.
    pub slot_count: usize,
    pub inputs: Vec<Input>,
    pub output: Option<ConnectionId>,
    pub previous: Option<ConnectionId>,
    pub next: Option<ConnectionId>,
    pub shadow: bool,
    pub movable: bool,
    pub in_flyout: bool,
    pub dragging: bool,
    pub xy: Coordinate,
    /// Per-block override of the duplicate-on-drag rules.
    pub duplicate_on_drag: Option<bool>,
}

impl Block {
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .flat_map(|i| i.fields.iter())
            .find_map(|f| match f {
                Field::Text { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            })
    }

    /// Own connections in the order a drag considers them: output, previous,
    /// next, then inputs top to bottom.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut out = Vec::new();
        out.extend(self.output);
        out.extend(self.previous);
        out.extend(self.next);
        out.extend(self.inputs.iter().filter_map(|i| i.connection));
        out
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(check: Option<Vec<&str>>) -> Connection {
        Connection {
            id: ConnectionId(0),
            block: BlockId(0),
            kind: ConnectionType::InputValue,
            offset: Coordinate::ORIGIN,
            check: check.map(|c| c.into_iter().map(String::from).collect()),
            target: None,
            shadow_state: None,
        }
    }

    #[test]
    fn connection_type_pairs() {
        assert_eq!(
            ConnectionType::OutputValue.opposite(),
            ConnectionType::InputValue
        );
        assert_eq!(
            ConnectionType::PreviousStatement.opposite(),
            ConnectionType::NextStatement
        );
        assert!(ConnectionType::InputValue.is_superior());
        assert!(!ConnectionType::PreviousStatement.is_superior());
        assert!(ConnectionType::PreviousStatement.is_plug());
    }

    #[test]
    fn checks_intersect_or_accept_any() {
        let dict = conn(Some(vec!["dict_item", "dict_unpack"]));
        assert!(dict.checks_compatible(&conn(Some(vec!["dict_item"]))));
        assert!(!dict.checks_compatible(&conn(Some(vec!["value"]))));
        assert!(dict.checks_compatible(&conn(None)));
    }
}
