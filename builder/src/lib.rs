// Licensed under the Apache-2.0 license

//! Linker script generation for RISC-V targets described by a devicetree.
//!
//! [`generate`] runs the whole pipeline: memory regions are extracted from
//! the tree, the first [`Strategy`] of the [`StrategyChain`] that recognizes
//! the memory topology assigns roles to them, and the requested
//! [`LinkPolicy`] lays the output sections out into a [`LinkerScript`].

pub mod extract;
pub mod layout;
pub mod memory;
pub mod section;
pub mod script;
pub mod strategy;

pub use extract::{extract_harts, extract_regions, Harts};
pub use layout::{LayoutContext, LinkPolicy};
pub use memory::{ChosenMemories, MemoryRegion, RegionSet};
pub use script::LinkerScript;
pub use section::{PhdrKind, ProgramHeader, Section};
pub use strategy::{LayoutRoles, Strategy, StrategyChain};

use ldgen_config::LayoutConfig;
use ldgen_fdt::{DeviceTree, FdtError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Failed to read devicetree: {0}")]
    Extract(#[from] FdtError),
    #[error("Entry offset 0x{offset:x} exceeds the size 0x{size:x} of {node}")]
    EntryOffset { node: String, offset: u64, size: u64 },
    #[error("No valid strategies found")]
    NoValidStrategy,
    #[error("Strategy {0} does not apply to this memory map")]
    StrategyNotApplicable(&'static str),
    #[error("Failed to render linker script: {0}")]
    Template(#[from] subst::Error),
}

/// The outcome of a generation run.
#[derive(Debug)]
pub struct GeneratedScript {
    pub strategy: Strategy,
    pub script: LinkerScript,
}

pub fn generate(
    dt: &DeviceTree,
    chain: &StrategyChain,
    policy: LinkPolicy,
    config: &LayoutConfig,
) -> Result<GeneratedScript, GenerateError> {
    let regions = extract_regions(dt)?;
    let harts = extract_harts(dt);
    let strategy = chain.select(&regions)?;
    let context = LayoutContext::new(config, harts);
    let script = strategy.layout(&regions, policy, &context)?;
    Ok(GeneratedScript { strategy, script })
}

/// Parses `blob` and renders the linker script for it.
pub fn generate_from_blob(
    blob: &[u8],
    policy: LinkPolicy,
    config: &LayoutConfig,
) -> Result<String, GenerateError> {
    let dt = DeviceTree::from_blob(blob)?;
    generate(&dt, &StrategyChain::default(), policy, config)?
        .script
        .render()
}
