// Licensed under the Apache-2.0 license

use super::LayoutRoles;
use crate::memory::{MemoryRegion, RegionSet};

fn resolve<'a>(regions: &'a RegionSet, node: Option<&str>) -> Option<&'a MemoryRegion> {
    regions.find_by_node(node?)
}

pub(super) fn valid(regions: &RegionSet) -> bool {
    let chosen = regions.chosen();
    resolve(regions, chosen.entry.as_deref()).is_some()
        && resolve(regions, chosen.ram.as_deref()).is_some()
}

pub(super) fn roles(regions: &RegionSet) -> Option<LayoutRoles> {
    let chosen = regions.chosen();
    let entry = resolve(regions, chosen.entry.as_deref())?;
    let ram = resolve(regions, chosen.ram.as_deref())?;

    // Booting from the RAM itself.
    if entry.node == ram.node {
        return Some(LayoutRoles::single(ram));
    }

    let ram = ram.as_ram();
    let itim = match resolve(regions, chosen.itim.as_deref()) {
        Some(itim) if itim.node != ram.node => itim.as_itim(),
        _ => ram.clone(),
    };
    Some(LayoutRoles::new(entry.as_flash(), itim, ram))
}

#[cfg(test)]
mod tests {
    use super::super::test_regions::region;
    use super::*;
    use crate::extract::{DTIM_TAG, ITIM_TAG, SPI_TAG, TESTRAM_TAG};
    use crate::memory::ChosenMemories;
    use crate::strategy::{Strategy, StrategyChain};

    fn topology() -> Vec<MemoryRegion> {
        vec![
            region(SPI_TAG, 0x2040_0000, 0x1fc0_0000),
            region(DTIM_TAG, 0x8000_0000, 0x4000),
            region(ITIM_TAG, 0x800_0000, 0x4000),
            region(TESTRAM_TAG, 0x1000_0000, 0x1000),
        ]
    }

    fn chosen(entry: &str, ram: &str, itim: Option<&str>) -> ChosenMemories {
        ChosenMemories {
            entry: Some(entry.to_string()),
            ram: Some(ram.to_string()),
            itim: itim.map(str::to_string),
        }
    }

    #[test]
    fn test_chosen_takes_precedence() {
        let regions = RegionSet::new(
            topology(),
            chosen("/soc/testram0@10000000", "/soc/dtim0@80000000", None),
        );
        assert!(Strategy::Rocket.valid(&regions));
        assert_eq!(
            StrategyChain::default().select(&regions).unwrap(),
            Strategy::Chosen
        );
        let roles = roles(&regions).unwrap();
        assert_eq!(roles.rom.name, "flash");
        assert_eq!(roles.rom.base, 0x1000_0000);
        assert_eq!(roles.ram.base, 0x8000_0000);
        assert_eq!(roles.itim, roles.ram);
    }

    #[test]
    fn test_chosen_itim() {
        let regions = RegionSet::new(
            topology(),
            chosen(
                "/soc/spi0@20400000",
                "/soc/dtim0@80000000",
                Some("/soc/itim0@8000000"),
            ),
        );
        let roles = roles(&regions).unwrap();
        assert_eq!(roles.itim.name, "itim");
        assert_eq!(roles.itim.attributes, "wx!rai");
        assert_eq!(roles.itim.base, 0x800_0000);
        assert_eq!(roles.rodata, roles.ram);
    }

    #[test]
    fn test_entry_in_ram() {
        let regions = RegionSet::new(
            topology(),
            chosen("/soc/dtim0@80000000", "/soc/dtim0@80000000", None),
        );
        let roles = roles(&regions).unwrap();
        assert_eq!(roles.rom, roles.ram);
        assert_eq!(roles.rom.name, "ram");
    }

    #[test]
    fn test_incomplete_chosen_is_invalid() {
        let missing_ram = ChosenMemories {
            entry: Some("/soc/spi0@20400000".to_string()),
            ..Default::default()
        };
        assert!(!valid(&RegionSet::new(topology(), missing_ram)));

        let dangling = chosen("/soc/spi0@20400000", "/soc/sram@0", None);
        assert!(!valid(&RegionSet::new(topology(), dangling)));
    }
}
