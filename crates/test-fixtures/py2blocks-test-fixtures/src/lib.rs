//! Shared JSON fixtures for py2blocks tests, indexed by `fixtures/manifest.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "extra-states")]
    extra_states: HashMap<String, String>,
    #[serde(rename = "block-trees")]
    block_trees: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

fn sorted_keys(map: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Persisted container shapes, including malformed ones.
pub mod extra_states {
    use super::*;

    /// One persisted `extraState` blob and the slot count it should restore to.
    #[derive(Debug, Clone, Deserialize)]
    pub struct NormalizationCase {
        pub name: String,
        pub state: serde_json::Value,
        pub expected: usize,
    }

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.extra_states)
    }

    pub fn cases(name: &str) -> Result<Vec<NormalizationCase>> {
        let rel = lookup(&MANIFEST.extra_states, "extra state", name)?;
        load_json(rel)
    }
}

/// Serialized block subtrees.
pub mod block_trees {
    use super::*;

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.block_trees)
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.block_trees, "block tree", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.block_trees, "block tree", name)?;
        load_json(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_resolves() {
        for key in block_trees::keys() {
            let value: serde_json::Value = block_trees::load(&key).expect("block tree parses");
            assert!(value.get("type").is_some(), "{key} has no type");
        }
        for key in extra_states::keys() {
            assert!(!extra_states::cases(&key).expect("cases parse").is_empty());
        }
    }

    #[test]
    fn unknown_names_are_reported() {
        let err = block_trees::json("nope").unwrap_err();
        assert!(err.to_string().contains("unknown block tree fixture 'nope'"));
    }
}
