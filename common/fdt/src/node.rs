// Licensed under the Apache-2.0 license

use crate::{DeviceTree, FdtError, FdtResult, NodeId};

const DEFAULT_ADDRESS_CELLS: u32 = 2;
const DEFAULT_SIZE_CELLS: u32 = 1;

/// The width of one element of a typed tuple, expressed in terms of the
/// devicetree cell-count properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// An address on the parent bus (parent's `#address-cells`).
    Address,
    /// A size on the parent bus (parent's `#size-cells`).
    Size,
    /// An address on this node's own bus (own `#address-cells`), as used by
    /// the child half of `ranges`.
    ChildAddress,
    /// A size on this node's own bus (own `#size-cells`), as used by the
    /// length of `ranges`.
    ChildSize,
    /// A single 32-bit cell.
    U32,
}

#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a DeviceTree,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Node").field(&self.path()).finish()
    }
}

impl<'a> Node<'a> {
    pub(crate) fn new(tree: &'a DeviceTree, id: NodeId) -> Self {
        Node { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.tree.data(self.id).name
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.tree.data(self.id).parent.map(|p| self.tree.node(p))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let tree = self.tree;
        tree.data(self.id).children.iter().map(move |&c| tree.node(c))
    }

    /// Full path of the node; this doubles as the node's handle.
    pub fn path(&self) -> String {
        match self.parent() {
            None => "/".to_string(),
            Some(parent) if parent.parent().is_none() => format!("/{}", self.name()),
            Some(parent) => format!("{}/{}", parent.path(), self.name()),
        }
    }

    pub fn property(&self, name: &str) -> Option<&'a [u8]> {
        self.tree
            .data(self.id)
            .properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_slice())
    }

    pub fn properties(&self) -> impl Iterator<Item = &'a crate::Property> + 'a {
        self.tree.data(self.id).properties.iter()
    }

    pub fn field_exists(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// The NUL-separated string list stored in `name`; empty when absent.
    pub fn strings(&self, name: &str) -> Vec<&'a str> {
        let Some(value) = self.property(name) else {
            return Vec::new();
        };
        value
            .split(|&b| b == 0)
            .filter(|s| !s.is_empty())
            .filter_map(|s| std::str::from_utf8(s).ok())
            .collect()
    }

    pub fn string(&self, name: &str) -> Option<&'a str> {
        self.strings(name).into_iter().next()
    }

    pub fn u32s(&self, name: &str) -> FdtResult<Option<Vec<u32>>> {
        let Some(value) = self.property(name) else {
            return Ok(None);
        };
        if value.len() % 4 != 0 {
            return Err(self.malformed(name, 4));
        }
        Ok(Some(
            value
                .chunks_exact(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ))
    }

    pub fn compatible(&self) -> Vec<&'a str> {
        self.strings("compatible")
    }

    pub fn device_type(&self) -> Option<&'a str> {
        self.string("device_type")
    }

    /// Every string that identifies what kind of device this node is.
    pub fn identifiers(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.compatible().into_iter().chain(self.device_type())
    }

    pub fn phandle(&self) -> Option<u32> {
        ["phandle", "linux,phandle"]
            .iter()
            .filter_map(|name| self.u32s(name).ok().flatten())
            .find_map(|cells| cells.first().copied())
    }

    fn own_cells(&self, name: &str, default: u32) -> u32 {
        self.u32s(name)
            .ok()
            .flatten()
            .and_then(|cells| cells.first().copied())
            .unwrap_or(default)
    }

    pub fn address_cells(&self) -> u32 {
        self.own_cells("#address-cells", DEFAULT_ADDRESS_CELLS)
    }

    pub fn size_cells(&self) -> u32 {
        self.own_cells("#size-cells", DEFAULT_SIZE_CELLS)
    }

    fn width(&self, cell: Cell) -> u32 {
        let bus = self.parent().unwrap_or(*self);
        match cell {
            Cell::Address => bus.address_cells(),
            Cell::Size => bus.size_cells(),
            Cell::ChildAddress => self.address_cells(),
            Cell::ChildSize => self.size_cells(),
            Cell::U32 => 1,
        }
    }

    /// Decodes `field` as a sequence of tuples laid out as `layout`.
    ///
    /// Returns `Ok(None)` if the field is absent.
    pub fn tuples(&self, field: &str, layout: &[Cell]) -> FdtResult<Option<Vec<Vec<u64>>>> {
        let Some(cells) = self.u32s(field)? else {
            return Ok(None);
        };
        let widths: Vec<u32> = layout.iter().map(|&c| self.width(c)).collect();
        if let Some(&w) = widths.iter().find(|&&w| w > 2) {
            return Err(FdtError::CellOverflow(w));
        }
        let stride: usize = widths.iter().map(|&w| w as usize).sum();
        if stride == 0 || cells.len() % stride != 0 {
            return Err(self.malformed(field, stride.max(1) * 4));
        }
        Ok(Some(
            cells
                .chunks_exact(stride)
                .map(|chunk| {
                    let mut pos = 0;
                    widths
                        .iter()
                        .map(|&w| {
                            let value = chunk[pos..pos + w as usize]
                                .iter()
                                .fold(0u64, |acc, &c| (acc << 32) | c as u64);
                            pos += w as usize;
                            value
                        })
                        .collect()
                })
                .collect(),
        ))
    }

    /// Calls `present` once per tuple of `field`, or `absent` if the node
    /// does not have the field.
    pub fn maybe_tuple(
        &self,
        field: &str,
        layout: &[Cell],
        absent: impl FnOnce(),
        mut present: impl FnMut(&[u64]),
    ) -> FdtResult<()> {
        match self.tuples(field, layout)? {
            None => absent(),
            Some(tuples) => tuples.iter().for_each(|t| present(t.as_slice())),
        }
        Ok(())
    }

    /// Finds the tuple of `values_field` at the position where `names_field`
    /// holds `name` (for example `reg` entry "mem" via `reg-names`).
    pub fn named_tuple(
        &self,
        names_field: &str,
        values_field: &str,
        name: &str,
        layout: &[Cell],
    ) -> FdtResult<Option<Vec<u64>>> {
        let Some(index) = self.strings(names_field).iter().position(|&n| n == name) else {
            return Ok(None);
        };
        Ok(self
            .tuples(values_field, layout)?
            .and_then(|mut tuples| (index < tuples.len()).then(|| tuples.swap_remove(index))))
    }

    fn malformed(&self, property: &str, expected: usize) -> FdtError {
        FdtError::MalformedProperty {
            node: self.path(),
            property: property.to_string(),
            expected,
        }
    }
}
