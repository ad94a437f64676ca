// Licensed under the Apache-2.0 license

use super::LayoutRoles;
use crate::extract::{DTIM_TAG, ITIM_TAG};
use crate::memory::RegionSet;

pub(super) fn valid(regions: &RegionSet, flash_tag: &str) -> bool {
    regions.has_tag(DTIM_TAG) && regions.has_tag(flash_tag)
}

pub(super) fn roles(regions: &RegionSet, flash_tag: &str) -> Option<LayoutRoles> {
    let ram = regions.find_by_tag(DTIM_TAG)?.as_ram();
    let rom = regions.find_by_tag(flash_tag)?.as_flash();
    let itim = regions
        .find_by_tag(ITIM_TAG)
        .map(|itim| itim.as_itim())
        .unwrap_or_else(|| ram.clone());
    Some(LayoutRoles::new(rom, itim, ram))
}
