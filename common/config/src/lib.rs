// Licensed under the Apache-2.0 license

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Tunables for the generated linker script.
/// These are the defaults that can be overridden by a TOML file or on the
/// command line.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Stack reserved per hart, unless the link overrides `__stack_size`.
    pub stack_size: u32,
    /// Heap reserved after the stacks, unless the link overrides `__heap_size`.
    pub heap_size: u32,
    /// Boot hart used when the devicetree does not name one.
    pub boot_hart: u32,
    pub chicken_bit: u32,
    /// Alignment of the data, bss, stack and heap sections.
    pub data_align: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            stack_size: 0x400,
            heap_size: 0x800,
            boot_hart: 0,
            chicken_bit: 0,
            data_align: 8,
        }
    }
}

impl LayoutConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: LayoutConfig = toml::from_str(contents)?;
        config.verify()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn verify(&self) -> Result<()> {
        if self.data_align == 0 || !self.data_align.is_power_of_two() {
            bail!("data_align must be a power of two, got {}", self.data_align);
        }
        Ok(())
    }

    /// Variables substituted into the linker script prologue template.
    pub fn hash_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("STACK_SIZE".to_string(), format!("0x{:x}", self.stack_size));
        map.insert("HEAP_SIZE".to_string(), format!("0x{:x}", self.heap_size));
        map.insert("BOOT_HART".to_string(), format!("{}", self.boot_hart));
        map.insert("CHICKEN_BIT".to_string(), format!("{}", self.chicken_bit));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LayoutConfig::from_toml_str("stack_size = 0x1000\n").unwrap();
        assert_eq!(config.stack_size, 0x1000);
        assert_eq!(config.heap_size, LayoutConfig::default().heap_size);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(LayoutConfig::from_toml_str("stak_size = 1\n").is_err());
    }

    #[test]
    fn test_bad_alignment_rejected() {
        let err = LayoutConfig::from_toml_str("data_align = 12\n").unwrap_err();
        assert!(err.to_string().contains("power of two"));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "heap_size = 4096\nboot_hart = 1").unwrap();
        let config = LayoutConfig::load(file.path()).unwrap();
        assert_eq!(config.heap_size, 4096);
        assert_eq!(config.boot_hart, 1);
    }

    #[test]
    fn test_hash_map() {
        let map = LayoutConfig::default().hash_map();
        assert_eq!(map["STACK_SIZE"], "0x400");
        assert_eq!(map["HEAP_SIZE"], "0x800");
        assert_eq!(map["BOOT_HART"], "0");
        assert!(!map.contains_key("DATA_ALIGN"));
    }
}
