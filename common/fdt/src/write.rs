// Licensed under the Apache-2.0 license

use crate::header::{
    FdtHeader, FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_LAST_COMP_VERSION, FDT_MAGIC, FDT_PROP,
    FDT_VERSION, HEADER_SIZE,
};
use crate::{DeviceTree, NodeId};
use std::collections::HashMap;
use zerocopy::IntoBytes;

// One empty reservation entry (address + size) terminates the map.
const MEM_RSVMAP_SIZE: usize = 16;

#[derive(Default)]
struct StringTable {
    bytes: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    fn offset(&mut self, name: &str) -> u32 {
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(name.to_string(), offset);
        offset
    }
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn pad(out: &mut Vec<u8>) {
    out.resize(out.len().next_multiple_of(4), 0);
}

fn write_node(tree: &DeviceTree, id: NodeId, out: &mut Vec<u8>, strings: &mut StringTable) {
    let data = tree.data(id);
    push_u32(out, FDT_BEGIN_NODE);
    out.extend_from_slice(data.name.as_bytes());
    out.push(0);
    pad(out);
    for property in &data.properties {
        push_u32(out, FDT_PROP);
        push_u32(out, property.value.len() as u32);
        push_u32(out, strings.offset(&property.name));
        out.extend_from_slice(&property.value);
        pad(out);
    }
    for &child in &data.children {
        write_node(tree, child, out, strings);
    }
    push_u32(out, FDT_END_NODE);
}

/// Serializes `tree` as a version 17 flattened devicetree blob.
pub(crate) fn write_blob(tree: &DeviceTree) -> Vec<u8> {
    let mut structure = Vec::new();
    let mut strings = StringTable::default();
    write_node(tree, DeviceTree::ROOT, &mut structure, &mut strings);
    push_u32(&mut structure, FDT_END);

    let off_mem_rsvmap = HEADER_SIZE.next_multiple_of(8);
    let off_dt_struct = off_mem_rsvmap + MEM_RSVMAP_SIZE;
    let off_dt_strings = off_dt_struct + structure.len();
    let totalsize = off_dt_strings + strings.bytes.len();

    let header = FdtHeader {
        magic: FDT_MAGIC.into(),
        totalsize: (totalsize as u32).into(),
        off_dt_struct: (off_dt_struct as u32).into(),
        off_dt_strings: (off_dt_strings as u32).into(),
        off_mem_rsvmap: (off_mem_rsvmap as u32).into(),
        version: FDT_VERSION.into(),
        last_comp_version: FDT_LAST_COMP_VERSION.into(),
        boot_cpuid_phys: tree.boot_cpuid_phys().into(),
        size_dt_strings: (strings.bytes.len() as u32).into(),
        size_dt_struct: (structure.len() as u32).into(),
    };

    let mut blob = Vec::with_capacity(totalsize);
    blob.extend_from_slice(header.as_bytes());
    blob.resize(off_dt_struct, 0);
    blob.extend_from_slice(&structure);
    blob.extend_from_slice(&strings.bytes);
    blob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_shared() {
        let mut dt = DeviceTree::new();
        let a = dt.add_node(DeviceTree::ROOT, "a");
        let b = dt.add_node(DeviceTree::ROOT, "b");
        dt.set_string(a, "compatible", "x");
        dt.set_string(b, "compatible", "y");
        let blob = dt.to_blob();
        let needle = b"compatible\0";
        let count = blob.windows(needle.len()).filter(|w| *w == needle.as_slice()).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_header_layout() {
        let blob = DeviceTree::new().to_blob();
        assert_eq!(&blob[0..4], &FDT_MAGIC.to_be_bytes());
        let totalsize = u32::from_be_bytes(blob[4..8].try_into().unwrap());
        assert_eq!(totalsize as usize, blob.len());
    }
}
