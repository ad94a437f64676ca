// Licensed under the Apache-2.0 license

use super::LayoutRoles;
use crate::extract::SRAM_TAG;
use crate::memory::RegionSet;

// The E21 exposes its ITIM and DTIM as two plain SRAMs.
pub(super) fn valid(regions: &RegionSet, flash_tag: &str) -> bool {
    regions.count_tag(SRAM_TAG) == 2 && regions.has_tag(flash_tag)
}

pub(super) fn roles(regions: &RegionSet, flash_tag: &str) -> Option<LayoutRoles> {
    // Canonical order puts the higher base first.
    let mut srams = regions.with_tag(SRAM_TAG);
    let ram = srams.next()?.as_ram();
    let itim = srams.next()?.as_itim();
    let rom = regions.find_by_tag(flash_tag)?.as_flash();
    Some(LayoutRoles::new(rom, itim, ram))
}
