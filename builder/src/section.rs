// Licensed under the Apache-2.0 license

use crate::memory::MemoryRegion;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhdrKind {
    Load,
    Null,
}

impl fmt::Display for PhdrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhdrKind::Load => write!(f, "PT_LOAD"),
            PhdrKind::Null => write!(f, "PT_NULL"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramHeader {
    pub name: String,
    pub kind: PhdrKind,
}

impl ProgramHeader {
    pub fn new(name: impl Into<String>, kind: PhdrKind) -> Self {
        ProgramHeader {
            name: name.into(),
            kind,
        }
    }

    /// The program header for a section running from `run` and loaded from
    /// `load`. Sections loaded where they run share the region's header,
    /// copied sections get `<run>_init`, and sections without load image
    /// get a `<run>_bss` `PT_NULL` header.
    pub fn for_placement(load: Option<&MemoryRegion>, run: &MemoryRegion) -> Self {
        match load {
            None => ProgramHeader::new(format!("{}_bss", run.name), PhdrKind::Null),
            Some(load) if load.name == run.name => {
                ProgramHeader::new(run.name.clone(), PhdrKind::Load)
            }
            Some(_) => ProgramHeader::new(format!("{}_init", run.name), PhdrKind::Load),
        }
    }
}

/// Renders the header as a `PHDRS` block entry.
impl fmt::Display for ProgramHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {};", self.name, self.kind)
    }
}

/// An output section and where it lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub output_name: String,
    pub align: Option<u32>,
    pub commands: Vec<String>,
    pub trailing_commands: Vec<String>,
    /// `None` for zero-initialized storage with no load image.
    pub load_region: Option<MemoryRegion>,
    pub run_region: MemoryRegion,
    pub program_header: ProgramHeader,
}

impl Section {
    pub fn new(output_name: &str, load: Option<&MemoryRegion>, run: &MemoryRegion) -> Self {
        Section {
            output_name: output_name.to_string(),
            align: None,
            commands: Vec::new(),
            trailing_commands: Vec::new(),
            load_region: load.cloned(),
            run_region: run.clone(),
            program_header: ProgramHeader::for_placement(load, run),
        }
    }

    pub fn aligned(mut self, align: u32) -> Self {
        self.align = Some(align);
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn trailing<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trailing_commands
            .extend(commands.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\t.{} :", self.output_name)?;
        if let Some(align) = self.align {
            write!(f, " ALIGN({})", align)?;
        }
        writeln!(f, " {{")?;
        for command in &self.commands {
            writeln!(f, "\t\t{}", command)?;
        }
        write!(f, "\t}} >{}", self.run_region.name)?;
        if let Some(load) = &self.load_region {
            write!(f, " AT>{}", load.name)?;
        }
        writeln!(f, " :{}", self.program_header.name)?;
        for command in &self.trailing_commands {
            writeln!(f, "\t{}", command)?;
        }
        Ok(())
    }
}
