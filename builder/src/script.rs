// Licensed under the Apache-2.0 license

use crate::memory::MemoryRegion;
use crate::section::{ProgramHeader, Section};
use crate::GenerateError;
use std::collections::HashMap;

/// A complete linker script: declarations plus the ordered section graph.
#[derive(Clone, Debug, Default)]
pub struct LinkerScript {
    memories: Vec<MemoryRegion>,
    phdrs: Vec<ProgramHeader>,
    sections: Vec<Section>,
    variables: HashMap<String, String>,
}

impl LinkerScript {
    /// `variables` feeds the `SECTIONS` prologue template.
    pub fn new(variables: HashMap<String, String>) -> Self {
        LinkerScript {
            variables,
            ..Default::default()
        }
    }

    /// Appends a section and declares the regions and program header it
    /// references, once per name, in order of first reference.
    pub fn push(&mut self, section: Section) {
        self.declare_memory(&section.run_region);
        if let Some(load) = &section.load_region {
            self.declare_memory(load);
        }
        if !self
            .phdrs
            .iter()
            .any(|p| p.name == section.program_header.name)
        {
            self.phdrs.push(section.program_header.clone());
        }
        self.sections.push(section);
    }

    pub fn extend(&mut self, sections: impl IntoIterator<Item = Section>) {
        for section in sections {
            self.push(section);
        }
    }

    fn declare_memory(&mut self, region: &MemoryRegion) {
        if !self.memories.iter().any(|m| m.name == region.name) {
            self.memories.push(region.clone());
        }
    }

    pub fn memories(&self) -> &[MemoryRegion] {
        &self.memories
    }

    pub fn phdrs(&self) -> &[ProgramHeader] {
        &self.phdrs
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.output_name == name)
    }

    pub fn render(&self) -> Result<String, GenerateError> {
        let mut out = String::from(LD_PREAMBLE);

        out.push_str("\nMEMORY\n{\n");
        for memory in &self.memories {
            out.push_str(&format!("\t{}\n", memory));
        }
        out.push_str("}\n\nPHDRS\n{\n");
        for phdr in &self.phdrs {
            out.push_str(&format!("\t{}\n", phdr));
        }
        out.push_str("}\n\nSECTIONS\n{\n");
        out.push_str(&subst::substitute(
            SECTIONS_PROLOGUE_TEMPLATE,
            &self.variables,
        )?);
        for section in &self.sections {
            out.push_str(&format!("\n{}", section));
        }
        out.push_str("}\n");
        Ok(out)
    }
}

const LD_PREAMBLE: &str = r#"/* Licensed under the Apache-2.0 license. */

/* Generated by ldgen; edits will be overwritten. */

OUTPUT_ARCH("riscv")

ENTRY(_enter)
"#;

const SECTIONS_PROLOGUE_TEMPLATE: &str = r#"	__stack_size = DEFINED(__stack_size) ? __stack_size : $STACK_SIZE;
	PROVIDE(__stack_size = __stack_size);
	__heap_size = DEFINED(__heap_size) ? __heap_size : $HEAP_SIZE;
	PROVIDE(__metal_boot_hart = $BOOT_HART);
	PROVIDE(__metal_chicken_bit = $CHICKEN_BIT);
	PROVIDE(__metal_hart_count = $HART_COUNT);
"#;
