// Licensed under the Apache-2.0 license

use super::LayoutRoles;
use crate::extract::MEMORY_TAG;
use crate::memory::RegionSet;

pub(super) fn valid(regions: &RegionSet, flash_tag: Option<&str>) -> bool {
    regions.has_tag(MEMORY_TAG) && flash_tag.map_or(true, |tag| regions.has_tag(tag))
}

pub(super) fn roles(regions: &RegionSet, flash_tag: Option<&str>) -> Option<LayoutRoles> {
    let memory = regions.find_by_tag(MEMORY_TAG)?;
    match flash_tag {
        Some(tag) => {
            let ram = memory.as_ram();
            let rom = regions.find_by_tag(tag)?.as_flash();
            Some(LayoutRoles::new(rom, ram.clone(), ram))
        }
        None => Some(LayoutRoles::single(memory)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_regions::{region, set};
    use super::*;
    use crate::extract::SPI_TAG;

    #[test]
    fn test_memory_with_flash() {
        let regions = set(vec![
            region(MEMORY_TAG, 0x8000_0000, 0x1000_0000),
            region(SPI_TAG, 0x2040_0000, 0x1fc0_0000),
        ]);
        assert!(valid(&regions, Some(SPI_TAG)));
        let roles = roles(&regions, Some(SPI_TAG)).unwrap();
        assert_eq!(roles.rom.name, "flash");
        assert_eq!(roles.itim, roles.ram);
    }

    #[test]
    fn test_memory_only() {
        let regions = set(vec![region(MEMORY_TAG, 0x8000_0000, 0x1000_0000)]);
        assert!(!valid(&regions, Some(SPI_TAG)));
        assert!(valid(&regions, None));
        let roles = roles(&regions, None).unwrap();
        assert_eq!(roles.rom, roles.ram);
        assert_eq!(roles.ram.attributes, "wxa!ri");
    }
}
