// Licensed under the Apache-2.0 license

//! Flattened devicetree support for the linker script generator.
//!
//! A [`DeviceTree`] is an arena of nodes that can be parsed from a compiled
//! blob ([`DeviceTree::from_blob`]), assembled in memory, or written back out
//! as a blob ([`DeviceTree::to_blob`]). [`Node`] exposes the queries the
//! memory map extraction relies on: field presence, typed cell tuples,
//! identifying strings and `/chosen` phandle resolution.

mod header;
mod node;
mod parse;
mod write;

pub use header::{FdtHeader, FDT_LAST_COMP_VERSION, FDT_MAGIC, FDT_VERSION};
pub use node::{Cell, Node};

use regex::Regex;
use thiserror::Error;

pub type FdtResult<T> = Result<T, FdtError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FdtError {
    #[error("Blob is too small to contain a devicetree header ({0} bytes)")]
    TooSmall(usize),
    #[error("Bad devicetree magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("Unsupported devicetree version {version} (last compatible {last_comp_version})")]
    UnsupportedVersion { version: u32, last_comp_version: u32 },
    #[error("Devicetree blob truncated at offset 0x{0:x}")]
    Truncated(usize),
    #[error("Unexpected structure token 0x{token:x} at offset 0x{offset:x}")]
    UnexpectedToken { token: u32, offset: usize },
    #[error("Invalid string at offset 0x{0:x}")]
    InvalidString(usize),
    #[error("Property {property} of {node} is not a multiple of {expected} bytes")]
    MalformedProperty {
        node: String,
        property: String,
        expected: usize,
    },
    #[error("{0} cells do not fit in a 64-bit value")]
    CellOverflow(u32),
}

/// Index of a node inside a [`DeviceTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) properties: Vec<Property>,
}

#[derive(Clone, Debug)]
pub struct DeviceTree {
    nodes: Vec<NodeData>,
    boot_cpuid_phys: u32,
}

impl Default for DeviceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTree {
    pub const ROOT: NodeId = NodeId(0);

    /// Creates a tree holding only an empty root node.
    pub fn new() -> Self {
        DeviceTree {
            nodes: vec![NodeData {
                name: String::new(),
                parent: None,
                children: Vec::new(),
                properties: Vec::new(),
            }],
            boot_cpuid_phys: 0,
        }
    }

    pub fn from_blob(blob: &[u8]) -> FdtResult<Self> {
        parse::parse_blob(blob)
    }

    pub fn to_blob(&self) -> Vec<u8> {
        write::write_blob(self)
    }

    pub fn boot_cpuid_phys(&self) -> u32 {
        self.boot_cpuid_phys
    }

    pub fn set_boot_cpuid_phys(&mut self, id: u32) {
        self.boot_cpuid_phys = id;
    }

    pub fn root(&self) -> Node<'_> {
        self.node(Self::ROOT)
    }

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node::new(self, id)
    }

    pub fn add_node(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            properties: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Sets a property, replacing any previous value with the same name.
    pub fn set_property(&mut self, node: NodeId, name: &str, value: impl Into<Vec<u8>>) {
        let value = value.into();
        let properties = &mut self.nodes[node.0].properties;
        match properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => properties.push(Property {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn set_u32s(&mut self, node: NodeId, name: &str, cells: &[u32]) {
        let value: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.set_property(node, name, value);
    }

    pub fn set_string(&mut self, node: NodeId, name: &str, value: &str) {
        self.set_strings(node, name, &[value]);
    }

    pub fn set_strings(&mut self, node: NodeId, name: &str, values: &[&str]) {
        let mut value = Vec::new();
        for s in values {
            value.extend_from_slice(s.as_bytes());
            value.push(0);
        }
        self.set_property(node, name, value);
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// All nodes in depth-first pre-order, starting at the root.
    pub fn nodes(&self) -> Vec<Node<'_>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            out.push(self.node(id));
            stack.extend(self.data(id).children.iter().rev());
        }
        out
    }

    pub fn find_path(&self, path: &str) -> Option<Node<'_>> {
        self.nodes().into_iter().find(|n| n.path() == path)
    }

    pub fn find_phandle(&self, phandle: u32) -> Option<Node<'_>> {
        self.nodes()
            .into_iter()
            .find(|n| n.phandle() == Some(phandle))
    }

    /// Nodes with an identifying string (a `compatible` entry or the
    /// `device_type`) matched by `pattern`. Callers wanting whole-string
    /// matches anchor the pattern themselves.
    pub fn match_nodes(&self, pattern: &Regex) -> Vec<Node<'_>> {
        self.nodes()
            .into_iter()
            .filter(|n| n.identifiers().any(|id| pattern.is_match(id)))
            .collect()
    }

    /// Resolves a `/chosen` property of the form `<&node cell...>`.
    ///
    /// Returns the referenced node and the trailing cells, or `None` if
    /// there is no `/chosen` node, the property is absent, or the phandle
    /// does not resolve.
    pub fn chosen(&self, field: &str) -> Option<(Node<'_>, Vec<u32>)> {
        let chosen = self.find_path("/chosen")?;
        let cells = chosen.u32s(field).ok()??;
        let (&phandle, rest) = cells.split_first()?;
        let node = self.find_phandle(phandle)?;
        Some((node, rest.to_vec()))
    }
}
