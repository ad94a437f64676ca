// Licensed under the Apache-2.0 license

use std::cmp::Ordering;
use std::fmt;

/// Flash: readable, executable, allocatable, never writable.
pub const FLASH_ATTRIBUTES: &str = "rxai!w";
/// RAM: writable, executable, allocatable, not read-only.
pub const RAM_ATTRIBUTES: &str = "wxa!ri";
/// ITIM: writable and executable, never chosen for read-only or orphan sections.
pub const ITIM_ATTRIBUTES: &str = "wx!rai";

/// A contiguous `[base, base + size)` span of memory found in the devicetree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemoryRegion {
    pub name: String,
    /// Identifying string the region was matched by, e.g. `sifive,dtim0`.
    pub tag: String,
    /// Path of the devicetree node the region came from.
    pub node: String,
    pub base: u64,
    pub size: u64,
    pub attributes: String,
}

impl MemoryRegion {
    pub fn new(tag: &str, node: &str, base: u64, size: u64) -> Self {
        MemoryRegion {
            name: tag.to_string(),
            tag: tag.to_string(),
            node: node.to_string(),
            base,
            size,
            attributes: String::new(),
        }
    }

    /// Zero-length regions are kept but never assigned a role.
    pub fn is_degenerate(&self) -> bool {
        self.size == 0
    }

    /// A copy of this region under a role name and access attributes.
    pub fn renamed(&self, name: &str, attributes: &str) -> Self {
        MemoryRegion {
            name: name.to_string(),
            attributes: attributes.to_string(),
            ..self.clone()
        }
    }

    pub fn as_flash(&self) -> Self {
        self.renamed("flash", FLASH_ATTRIBUTES)
    }

    pub fn as_ram(&self) -> Self {
        self.renamed("ram", RAM_ATTRIBUTES)
    }

    pub fn as_itim(&self) -> Self {
        self.renamed("itim", ITIM_ATTRIBUTES)
    }
}

impl Ord for MemoryRegion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .cmp(&other.base)
            .then_with(|| self.size.cmp(&other.size))
            .then_with(|| self.tag.cmp(&other.tag))
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.attributes.cmp(&other.attributes))
    }
}

impl PartialOrd for MemoryRegion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Renders the region as a `MEMORY` block entry.
impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) : ORIGIN = 0x{:x}, LENGTH = 0x{:x}",
            self.name, self.attributes, self.base, self.size
        )
    }
}

/// Node paths referenced from `/chosen`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChosenMemories {
    pub entry: Option<String>,
    pub ram: Option<String>,
    pub itim: Option<String>,
}

/// Every extracted region, held in canonical (descending base) order.
#[derive(Clone, Debug, Default)]
pub struct RegionSet {
    regions: Vec<MemoryRegion>,
    chosen: ChosenMemories,
}

impl RegionSet {
    pub fn new(mut regions: Vec<MemoryRegion>, chosen: ChosenMemories) -> Self {
        regions.sort();
        regions.reverse();
        RegionSet { regions, chosen }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn chosen(&self) -> &ChosenMemories {
        &self.chosen
    }

    /// Usable regions carrying `tag`, highest base first.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a MemoryRegion> + 'a {
        self.regions
            .iter()
            .filter(move |r| r.tag == tag && !r.is_degenerate())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.with_tag(tag).next().is_some()
    }

    pub fn count_tag(&self, tag: &str) -> usize {
        self.with_tag(tag).count()
    }

    /// The region bound to `tag`. Regions are visited from high to low base
    /// and each match overwrites the previous one, so the lowest-base alias
    /// wins. Returns `None` when no usable region carries the tag.
    pub fn find_by_tag(&self, tag: &str) -> Option<&MemoryRegion> {
        let mut found = None;
        for region in self
            .regions
            .iter()
            .filter(|r| r.tag == tag && !r.is_degenerate())
        {
            found = Some(region);
        }
        found
    }

    /// The usable region extracted from the node at `path`, with the same
    /// lowest-base-wins rule as [`RegionSet::find_by_tag`]. Returns `None`
    /// when the node produced no usable region.
    pub fn find_by_node(&self, path: &str) -> Option<&MemoryRegion> {
        let mut found = None;
        for region in self
            .regions
            .iter()
            .filter(|r| r.node == path && !r.is_degenerate())
        {
            found = Some(region);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let region = MemoryRegion::new("sifive,spi0", "/soc/spi@10014000", 0x2000_0000, 0x100_0000)
            .as_flash();
        assert_eq!(
            region.to_string(),
            "flash (rxai!w) : ORIGIN = 0x20000000, LENGTH = 0x1000000"
        );
    }

    #[test]
    fn test_display_full_width() {
        let region = MemoryRegion::new("memory", "/memory@1000000000", 0x10_0000_0000, 0x1_0000_0000)
            .as_ram();
        assert_eq!(
            region.to_string(),
            "ram (wxa!ri) : ORIGIN = 0x1000000000, LENGTH = 0x100000000"
        );
    }

    #[test]
    fn test_canonical_order_is_descending() {
        let set = RegionSet::new(
            vec![
                MemoryRegion::new("a", "/a", 0x1000, 0x10),
                MemoryRegion::new("b", "/b", 0x3000, 0x10),
                MemoryRegion::new("c", "/c", 0x2000, 0x10),
            ],
            ChosenMemories::default(),
        );
        let bases: Vec<u64> = set.iter().map(|r| r.base).collect();
        assert_eq!(bases, vec![0x3000, 0x2000, 0x1000]);
    }

    #[test]
    fn test_lowest_base_wins_for_tag() {
        let set = RegionSet::new(
            vec![
                MemoryRegion::new("sifive,sram0", "/soc/sram@1000", 0x1000, 0x100),
                MemoryRegion::new("sifive,sram0", "/soc/sram@2000", 0x2000, 0x100),
            ],
            ChosenMemories::default(),
        );
        assert_eq!(set.find_by_tag("sifive,sram0").unwrap().base, 0x1000);
        assert_eq!(set.count_tag("sifive,sram0"), 2);
    }

    #[test]
    fn test_lookup_outlives_tag() {
        let set = RegionSet::new(
            vec![MemoryRegion::new("sifive,sram0", "/soc/sram@1000", 0x1000, 0x100)],
            ChosenMemories::default(),
        );
        let found = {
            let tag = String::from("sifive,sram0");
            set.find_by_tag(&tag)
        };
        assert_eq!(found.map(|r| r.base), Some(0x1000));
    }

    #[test]
    fn test_lookup_absent() {
        let set = RegionSet::new(
            vec![MemoryRegion::new("sifive,dtim0", "/soc/dtim@80000000", 0x8000_0000, 0x4000)],
            ChosenMemories::default(),
        );
        assert!(set.find_by_tag("sifive,itim0").is_none());
        assert!(set.find_by_node("/soc/itim@8000000").is_none());
        assert!(RegionSet::default().find_by_tag("sifive,dtim0").is_none());
    }

    #[test]
    fn test_degenerate_regions_are_skipped() {
        let set = RegionSet::new(
            vec![MemoryRegion::new("sifive,testram0", "/soc/testram@0", 0, 0)],
            ChosenMemories::default(),
        );
        assert_eq!(set.len(), 1);
        assert!(!set.has_tag("sifive,testram0"));
        assert!(set.find_by_node("/soc/testram@0").is_none());
    }
}
