// Licensed under the Apache-2.0 license

//! Recognition of known memory topologies.
//!
//! Strategies are tried from the most to the least specific topology because
//! the simpler memory maps would also match on richer designs.

mod bullet;
mod chosen;
mod e20;
mod e21;
mod rocket;

use crate::extract::{SPI_TAG, TESTRAM_TAG};
use crate::layout::{LayoutContext, LinkPolicy};
use crate::memory::{MemoryRegion, RegionSet};
use crate::script::LinkerScript;
use crate::GenerateError;
use log::info;
use std::fmt;

/// Regions bound to the roles the layout generators place sections into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutRoles {
    pub rom: MemoryRegion,
    pub itim: MemoryRegion,
    pub ram: MemoryRegion,
    /// Where the ramrodata policy runs read-only data from.
    pub rodata: MemoryRegion,
}

impl LayoutRoles {
    pub fn new(rom: MemoryRegion, itim: MemoryRegion, ram: MemoryRegion) -> Self {
        LayoutRoles {
            rom,
            itim,
            rodata: ram.clone(),
            ram,
        }
    }

    /// One region serving every role, declared once as `ram`.
    pub fn single(region: &MemoryRegion) -> Self {
        let ram = region.as_ram();
        LayoutRoles::new(ram.clone(), ram.clone(), ram)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Regions named by `/chosen/metal,entry`, `metal,ram` and `metal,itim`.
    Chosen,
    E21Arty,
    E21,
    RocketArty,
    Rocket,
    BulletArty,
    Bullet,
    E20Arty,
    E20,
}

pub const DEFAULT_PRIORITY: [Strategy; 9] = [
    Strategy::Chosen,
    Strategy::E21Arty,
    Strategy::E21,
    Strategy::RocketArty,
    Strategy::Rocket,
    Strategy::BulletArty,
    Strategy::Bullet,
    Strategy::E20Arty,
    Strategy::E20,
];

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Chosen => "chosen",
            Strategy::E21Arty => "e21-arty",
            Strategy::E21 => "e21",
            Strategy::RocketArty => "rocket-arty",
            Strategy::Rocket => "rocket",
            Strategy::BulletArty => "bullet-arty",
            Strategy::Bullet => "bullet",
            Strategy::E20Arty => "e20-arty",
            Strategy::E20 => "e20",
        }
    }

    pub fn valid(&self, regions: &RegionSet) -> bool {
        match self {
            Strategy::Chosen => chosen::valid(regions),
            Strategy::E21Arty => e21::valid(regions, SPI_TAG),
            Strategy::E21 => e21::valid(regions, TESTRAM_TAG),
            Strategy::RocketArty => rocket::valid(regions, SPI_TAG),
            Strategy::Rocket => rocket::valid(regions, TESTRAM_TAG),
            Strategy::BulletArty => bullet::valid(regions, Some(SPI_TAG)),
            Strategy::Bullet => bullet::valid(regions, None),
            Strategy::E20Arty => e20::valid(regions, Some(SPI_TAG)),
            Strategy::E20 => e20::valid(regions, None),
        }
    }

    /// Binds regions to roles, or `None` if the topology does not match.
    pub fn roles(&self, regions: &RegionSet) -> Option<LayoutRoles> {
        if !self.valid(regions) {
            return None;
        }
        match self {
            Strategy::Chosen => chosen::roles(regions),
            Strategy::E21Arty => e21::roles(regions, SPI_TAG),
            Strategy::E21 => e21::roles(regions, TESTRAM_TAG),
            Strategy::RocketArty => rocket::roles(regions, SPI_TAG),
            Strategy::Rocket => rocket::roles(regions, TESTRAM_TAG),
            Strategy::BulletArty => bullet::roles(regions, Some(SPI_TAG)),
            Strategy::Bullet => bullet::roles(regions, None),
            Strategy::E20Arty => e20::roles(regions, Some(SPI_TAG)),
            Strategy::E20 => e20::roles(regions, None),
        }
    }

    pub fn layout(
        &self,
        regions: &RegionSet,
        policy: LinkPolicy,
        context: &LayoutContext,
    ) -> Result<LinkerScript, GenerateError> {
        let roles = self
            .roles(regions)
            .ok_or(GenerateError::StrategyNotApplicable(self.name()))?;

        info!("Using strategy {} with {} layout", self.name(), policy);
        info!("\tRAM:  {:>18} - 0x{:x}", roles.ram.tag, roles.ram.base);
        info!("\tROM:  {:>18} - 0x{:x}", roles.rom.tag, roles.rom.base);
        info!("\tITIM: {:>18} - 0x{:x}", roles.itim.tag, roles.itim.base);

        Ok(policy.build(&roles, context))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered list of strategies; the first valid one wins.
#[derive(Clone, Copy, Debug)]
pub struct StrategyChain<'a> {
    strategies: &'a [Strategy],
}

impl<'a> StrategyChain<'a> {
    pub const fn new(strategies: &'a [Strategy]) -> Self {
        StrategyChain { strategies }
    }

    pub fn strategies(&self) -> &'a [Strategy] {
        self.strategies
    }

    pub fn select(&self, regions: &RegionSet) -> Result<Strategy, GenerateError> {
        self.strategies
            .iter()
            .copied()
            .find(|s| s.valid(regions))
            .ok_or(GenerateError::NoValidStrategy)
    }
}

impl Default for StrategyChain<'static> {
    fn default() -> Self {
        StrategyChain::new(&DEFAULT_PRIORITY)
    }
}
