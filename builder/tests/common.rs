// Licensed under the Apache-2.0 license

#![allow(dead_code)]

use ldgen_fdt::{DeviceTree, NodeId};
use log::LevelFilter;
use simple_logger::SimpleLogger;

pub fn setup() {
    // Initialize log level (only once)
    let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
}

/// A tree with `harts` cpus and an empty `/soc` bus using one address and
/// one size cell.
pub fn board(harts: u32) -> (DeviceTree, NodeId) {
    let mut dt = DeviceTree::new();
    dt.set_u32s(DeviceTree::ROOT, "#address-cells", &[1]);
    dt.set_u32s(DeviceTree::ROOT, "#size-cells", &[1]);
    dt.set_strings(DeviceTree::ROOT, "compatible", &["sifive,test-board"]);

    let cpus = dt.add_node(DeviceTree::ROOT, "cpus");
    dt.set_u32s(cpus, "#address-cells", &[1]);
    dt.set_u32s(cpus, "#size-cells", &[0]);
    for hart in 0..harts {
        let cpu = dt.add_node(cpus, &format!("cpu@{}", hart));
        dt.set_string(cpu, "device_type", "cpu");
        dt.set_strings(cpu, "compatible", &["sifive,rocket0", "riscv"]);
        dt.set_u32s(cpu, "reg", &[hart]);
        dt.set_u32s(cpu, "phandle", &[0x100 + hart]);
    }

    let soc = dt.add_node(DeviceTree::ROOT, "soc");
    dt.set_u32s(soc, "#address-cells", &[1]);
    dt.set_u32s(soc, "#size-cells", &[1]);
    dt.set_strings(soc, "compatible", &["simple-bus"]);
    dt.set_property(soc, "ranges", Vec::new());
    (dt, soc)
}

pub fn memory_device(
    dt: &mut DeviceTree,
    soc: NodeId,
    tag: &str,
    base: u32,
    size: u32,
    phandle: u32,
) -> NodeId {
    let name = format!("{}@{:x}", tag.trim_start_matches("sifive,"), base);
    let node = dt.add_node(soc, &name);
    dt.set_string(node, "compatible", tag);
    dt.set_u32s(node, "reg", &[base, size]);
    dt.set_u32s(node, "phandle", &[phandle]);
    node
}

pub fn chosen(dt: &mut DeviceTree, property: &str, cells: &[u32]) {
    let chosen = match dt.find_path("/chosen") {
        Some(node) => node.id(),
        None => dt.add_node(DeviceTree::ROOT, "chosen"),
    };
    dt.set_u32s(chosen, property, cells);
}
