//! Registry of call blocks by the procedure name they invoke.

use hashbrown::HashMap;

use crate::ids::BlockId;

#[derive(Debug, Default)]
pub struct ProcedureRegistry {
    callers: HashMap<String, Vec<BlockId>>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `block` as a caller of `name`, dropping any earlier registration.
    pub fn register(&mut self, name: &str, block: BlockId) {
        self.deregister(block);
        self.callers.entry(name.to_string()).or_default().push(block);
    }

    pub fn deregister(&mut self, block: BlockId) {
        self.callers.retain(|_, ids| {
            ids.retain(|b| *b != block);
            !ids.is_empty()
        });
    }

    pub fn callers(&self, name: &str) -> &[BlockId] {
        self.callers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_registered(&self, block: BlockId) -> bool {
        self.callers.values().any(|ids| ids.contains(&block))
    }

    /// Procedure names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
