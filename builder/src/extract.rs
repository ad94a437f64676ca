// Licensed under the Apache-2.0 license

//! Memory map extraction from the devicetree.

use crate::memory::{ChosenMemories, MemoryRegion, RegionSet};
use crate::GenerateError;
use ldgen_fdt::{Cell, DeviceTree, FdtResult, Node};
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

pub const DTIM_TAG: &str = "sifive,dtim0";
pub const ITIM_TAG: &str = "sifive,itim0";
pub const SPI_TAG: &str = "sifive,spi0";
pub const SRAM_TAG: &str = "sifive,sram0";
pub const TESTRAM_TAG: &str = "sifive,testram0";
pub const MEMORY_TAG: &str = "memory";

/// Identifying strings of memory devices, in extraction order.
pub const MEMORY_DEVICE_TAGS: [&str; 18] = [
    DTIM_TAG,
    ITIM_TAG,
    SPI_TAG,
    SRAM_TAG,
    TESTRAM_TAG,
    MEMORY_TAG,
    "sifive,axi4-periph-port",
    "sifive,ahb-periph-port",
    "sifive,tl-periph-port",
    "sifive,axi4-sys-port",
    "sifive,ahb-sys-port",
    "sifive,tl-sys-port",
    "sifive,axi4-mem-port",
    "sifive,ahb-mem-port",
    "sifive,tl-mem-port",
    "sifive,periph-port",
    "sifive,sys-port",
    "sifive,mem-port",
];

const REG_LAYOUT: [Cell; 2] = [Cell::Address, Cell::Size];
const RANGES_LAYOUT: [Cell; 3] = [Cell::ChildAddress, Cell::Address, Cell::ChildSize];

type AddressResolver = fn(&Node) -> FdtResult<Option<(u64, u64)>>;

pub struct MemoryDevice {
    pub tag: &'static str,
    pattern: Regex,
    resolve: AddressResolver,
}

impl MemoryDevice {
    fn new(tag: &'static str, resolve: AddressResolver) -> Self {
        MemoryDevice {
            tag,
            // Tags are fixed and must match the whole identifying string.
            pattern: Regex::new(&format!("^(?:{})$", tag)).expect("memory device tag is a valid pattern"),
            resolve,
        }
    }
}

pub static MEMORY_DEVICES: LazyLock<Vec<MemoryDevice>> = LazyLock::new(|| {
    MEMORY_DEVICE_TAGS
        .iter()
        .map(|&tag| MemoryDevice::new(tag, resolve_mem_map))
        .collect()
});

/// Resolves a memory node's `(base, size)`: the `reg` entry named "mem" if
/// the node names its registers, else the first non-empty `ranges`
/// translation, else the first plain `reg` tuple.
pub fn resolve_mem_map(node: &Node) -> FdtResult<Option<(u64, u64)>> {
    if node.field_exists("reg-names") {
        return Ok(node
            .named_tuple("reg-names", "reg", "mem", &REG_LAYOUT)?
            .map(|t| (t[0], t[1])));
    }

    let mut found = None;
    if node.field_exists("ranges") {
        node.maybe_tuple(
            "ranges",
            &RANGES_LAYOUT,
            || {},
            |t| {
                if found.is_none() && t[0] != 0 && t[2] != 0 {
                    found = Some((t[0], t[2]));
                }
            },
        )?;
    } else {
        node.maybe_tuple(
            "reg",
            &REG_LAYOUT,
            || debug!("{} has no reg property", node.path()),
            |t| {
                if found.is_none() {
                    found = Some((t[0], t[1]));
                }
            },
        )?;
    }
    Ok(found)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    pub node: String,
    pub offset: u64,
}

/// `/chosen/metal,entry = <&node offset>`.
pub fn entry_point(dt: &DeviceTree) -> Option<EntryPoint> {
    dt.chosen("metal,entry").map(|(node, cells)| EntryPoint {
        node: node.path(),
        offset: cells.first().copied().unwrap_or(0) as u64,
    })
}

fn chosen_node(dt: &DeviceTree, field: &str) -> Option<String> {
    dt.chosen(field).map(|(node, _)| node.path())
}

/// Moves the start of `region` forward by the entry offset.
pub fn apply_entry_offset(region: &mut MemoryRegion, offset: u64) -> Result<(), GenerateError> {
    let size = region
        .size
        .checked_sub(offset)
        .ok_or_else(|| GenerateError::EntryOffset {
            node: region.node.clone(),
            offset,
            size: region.size,
        })?;
    region.base += offset;
    region.size = size;
    Ok(())
}

/// Walks the devicetree once per memory device tag and collects a region
/// for every matching node.
pub fn extract_regions(dt: &DeviceTree) -> Result<RegionSet, GenerateError> {
    let entry = entry_point(dt);
    let mut regions = Vec::new();

    for device in MEMORY_DEVICES.iter() {
        for node in dt.match_nodes(&device.pattern) {
            let (base, size) = (device.resolve)(&node)?.unwrap_or_else(|| {
                warn!("Unable to resolve an address for {} ({})", node.path(), device.tag);
                (0, 0)
            });
            let mut region = MemoryRegion::new(device.tag, &node.path(), base, size);
            if let Some(entry) = entry.as_ref().filter(|e| e.node == region.node) {
                if region.is_degenerate() {
                    warn!(
                        "Ignoring entry offset 0x{:x} for unresolved {}",
                        entry.offset, region.node
                    );
                } else {
                    apply_entry_offset(&mut region, entry.offset)?;
                }
            }
            debug!(
                "Found {} at {}: 0x{:x} + 0x{:x}",
                region.tag, region.node, region.base, region.size
            );
            regions.push(region);
        }
    }

    let chosen = ChosenMemories {
        entry: entry.map(|e| e.node),
        ram: chosen_node(dt, "metal,ram"),
        itim: chosen_node(dt, "metal,itim"),
    };
    Ok(RegionSet::new(regions, chosen))
}

/// Hart topology relevant to stack reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Harts {
    pub count: u32,
    /// Boot hart named by `/chosen/metal,boot-hart`, if any.
    pub boot_hart: Option<u32>,
}

impl Default for Harts {
    fn default() -> Self {
        Harts {
            count: 1,
            boot_hart: None,
        }
    }
}

pub fn extract_harts(dt: &DeviceTree) -> Harts {
    let count = dt
        .nodes()
        .iter()
        .filter(|n| n.device_type() == Some("cpu"))
        .count()
        .max(1) as u32;
    let boot_hart = dt.chosen("metal,boot-hart").and_then(|(cpu, _)| {
        cpu.u32s("reg")
            .ok()
            .flatten()
            .and_then(|reg| reg.first().copied())
    });
    Harts { count, boot_hart }
}
