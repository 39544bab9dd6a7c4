//! Duplicate-on-drag rules.
//!
//! A rule names a parent block type and optionally the input and the child
//! type it applies to. Dragging a matching child out leaves a copy behind.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRule {
    pub parent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_type: Option<String>,
}

impl DuplicateRule {
    fn matches(&self, parent_type: &str, input_name: Option<&str>, child_type: &str) -> bool {
        if self.parent_type != parent_type {
            return false;
        }
        let input_ok = match (&self.input_name, input_name) {
            (None, _) => true,
            (Some(want), Some(have)) => want == have,
            (Some(_), None) => false,
        };
        input_ok
            && self
                .child_type
                .as_deref()
                .map_or(true, |want| want == child_type)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuplicateOnDragRules {
    rules: Vec<DuplicateRule>,
}

impl DuplicateOnDragRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Returns false when an identical rule already exists.
    pub fn add(
        &mut self,
        parent_type: &str,
        input_name: Option<&str>,
        child_type: Option<&str>,
    ) -> bool {
        let rule = DuplicateRule {
            parent_type: parent_type.to_string(),
            input_name: input_name.map(str::to_string),
            child_type: child_type.map(str::to_string),
        };
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// `input_name` is `None` when the child hangs off the parent's next
    /// connection rather than an input.
    pub fn matches(&self, parent_type: &str, input_name: Option<&str>, child_type: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.matches(parent_type, input_name, child_type))
    }

    pub fn rules(&self) -> &[DuplicateRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_deduplicated() {
        let mut rules = DuplicateOnDragRules::new();
        assert!(rules.add("Call", Some("input_000001"), None));
        assert!(!rules.add("Call", Some("input_000001"), None));
        assert!(rules.add("Call", None, Some("int")));
        assert_eq!(rules.rules().len(), 2);
    }

    #[test]
    fn unspecified_parts_match_anything() {
        let mut rules = DuplicateOnDragRules::new();
        rules.add("List", None, None);
        rules.add("Dict", Some("input_000001"), Some("dict_item"));

        assert!(rules.matches("List", Some("input_000004"), "int"));
        assert!(rules.matches("List", None, "Pass"));
        assert!(rules.matches("Dict", Some("input_000001"), "dict_item"));
        assert!(!rules.matches("Dict", Some("input_000002"), "dict_item"));
        assert!(!rules.matches("Dict", Some("input_000001"), "dict_unpack"));
        assert!(!rules.matches("Dict", None, "dict_item"));
        assert!(!rules.matches("Set", Some("input_000001"), "int"));
    }
}
