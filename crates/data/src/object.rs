//! Compilation units.
//!
//! An [`Object`] is a named unit: a top-level block, its analysis side table,
//! and an ordered list of sub-nodes. Each sub-node is either another object
//! (translated recursively) or an opaque [`Data`] blob (copied unchanged).

use crate::ast::{Block, Name, Type};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub parameters: Vec<Type>,
    pub returns: Vec<Type>,
}

/// Side table produced by semantic analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisInfo {
    /// Signature of every function defined in the unit, keyed by name. Names
    /// are globally unique in analyzed pipeline output; for raw input with
    /// shadowed definitions the innermost definition wins.
    pub functions: BTreeMap<Name, FunctionSig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub name: Name,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectNode {
    Object(Object),
    Data(Data),
}

impl ObjectNode {
    pub fn name(&self) -> &Name {
        match self {
            ObjectNode::Object(object) => &object.name,
            ObjectNode::Data(data) => &data.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub name: Name,
    pub code: Block,
    pub analysis: AnalysisInfo,
    pub children: Vec<ObjectNode>,
    /// Sub-node name to position in `children`.
    pub index: BTreeMap<Name, usize>,
}

impl Object {
    pub fn new(name: impl Into<Name>, code: Block) -> Self {
        Self {
            name: name.into(),
            code,
            analysis: AnalysisInfo::default(),
            children: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Append a sub-node, keeping the name index in sync.
    pub fn push_child(&mut self, child: ObjectNode) {
        self.index.insert(child.name().clone(), self.children.len());
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&ObjectNode> {
        self.index.get(name).map(|&position| &self.children[position])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_lookup_follows_index() {
        let mut object = Object::new("outer", Block::default());
        object.push_child(ObjectNode::Data(Data { name: "table".into(), bytes: vec![1, 2, 3] }));
        object.push_child(ObjectNode::Object(Object::new("inner", Block::default())));

        assert_eq!(object.index["table"], 0);
        assert_eq!(object.index["inner"], 1);
        match object.child("table") {
            Some(ObjectNode::Data(data)) => assert_eq!(data.bytes, vec![1, 2, 3]),
            other => panic!("unexpected child: {other:?}"),
        }
        assert!(object.child("missing").is_none());
    }
}
