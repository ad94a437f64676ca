// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use clap_num::maybe_hex;
use ldgen_builder::{generate, LinkPolicy, StrategyChain};
use ldgen_config::LayoutConfig;
use ldgen_fdt::DeviceTree;
use log::{debug, info, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::PathBuf;

/// Generate a linker script for a RISC-V target from its devicetree
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Compiled devicetree blob describing the target
    #[arg(short, long, value_name = "PATH")]
    dtb: PathBuf,

    /// Where to write the linker script
    #[arg(short, long, value_name = "PATH")]
    linker: PathBuf,

    /// Load code, read-only data and data directly into RAM
    #[arg(long, default_value_t = false, conflicts_with = "ramrodata")]
    scratchpad: bool,

    /// Execute in place from flash but run read-only data from RAM
    #[arg(long, default_value_t = false)]
    ramrodata: bool,

    /// TOML file with layout settings
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Stack reserved per hart
    #[arg(long, value_parser=maybe_hex::<u32>)]
    stack_size: Option<u32>,

    /// Heap reserved after the stacks
    #[arg(long, value_parser=maybe_hex::<u32>)]
    heap_size: Option<u32>,

    /// Log every extracted memory region
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn policy(&self) -> LinkPolicy {
        if self.scratchpad {
            LinkPolicy::Scratchpad
        } else if self.ramrodata {
            LinkPolicy::Ramrodata
        } else {
            LinkPolicy::Default
        }
    }

    fn layout_config(&self) -> Result<LayoutConfig> {
        let mut config = match &self.config {
            Some(path) => LayoutConfig::load(path)?,
            None => LayoutConfig::default(),
        };
        if let Some(stack_size) = self.stack_size {
            config.stack_size = stack_size;
        }
        if let Some(heap_size) = self.heap_size {
            config.heap_size = heap_size;
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.layout_config()?;
    debug!("Layout config: {:?}", config);

    let blob = std::fs::read(&cli.dtb)
        .with_context(|| format!("Unable to read devicetree {}", cli.dtb.display()))?;
    let dt = DeviceTree::from_blob(&blob)
        .with_context(|| format!("Unable to parse devicetree {}", cli.dtb.display()))?;

    let generated = generate(&dt, &StrategyChain::default(), cli.policy(), &config)?;
    // Render before touching the output so failures leave nothing behind.
    let script = generated.script.render()?;
    std::fs::write(&cli.linker, script)
        .with_context(|| format!("Unable to write linker script {}", cli.linker.display()))?;
    info!(
        "Linker script for {} written to {}",
        generated.strategy,
        cli.linker.display()
    );
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).init();

    run(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}
