// Licensed under the Apache-2.0 license

use super::LayoutRoles;
use crate::extract::TESTRAM_TAG;
use crate::memory::RegionSet;

pub(super) fn valid(regions: &RegionSet, flash_tag: Option<&str>) -> bool {
    regions.has_tag(TESTRAM_TAG) && flash_tag.map_or(true, |tag| regions.has_tag(tag))
}

pub(super) fn roles(regions: &RegionSet, flash_tag: Option<&str>) -> Option<LayoutRoles> {
    let testram = regions.find_by_tag(TESTRAM_TAG)?;
    match flash_tag {
        Some(tag) => {
            let ram = testram.as_ram();
            let rom = regions.find_by_tag(tag)?.as_flash();
            Some(LayoutRoles::new(rom, ram.clone(), ram))
        }
        None => Some(LayoutRoles::single(testram)),
    }
}
