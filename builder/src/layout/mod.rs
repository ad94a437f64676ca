// Licensed under the Apache-2.0 license

//! Section placement policies.
//!
//! Every policy emits the same sections in the same order. They differ only
//! in which role region each class of section is loaded from and runs in.

mod default;
mod ramrodata;
mod scratchpad;

use crate::extract::Harts;
use crate::memory::MemoryRegion;
use crate::script::LinkerScript;
use crate::section::Section;
use crate::strategy::LayoutRoles;
use ldgen_config::LayoutConfig;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LinkPolicy {
    /// Execute in place from flash, copy data to RAM.
    #[default]
    Default,
    /// Load everything straight into RAM.
    Scratchpad,
    /// Like `Default`, but read-only data is copied to RAM.
    Ramrodata,
}

impl LinkPolicy {
    pub fn build(&self, roles: &LayoutRoles, context: &LayoutContext) -> LinkerScript {
        let placement = match self {
            LinkPolicy::Default => default::placement(roles),
            LinkPolicy::Scratchpad => scratchpad::placement(roles),
            LinkPolicy::Ramrodata => ramrodata::placement(roles),
        };
        assemble(&placement, context)
    }
}

impl fmt::Display for LinkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkPolicy::Default => write!(f, "default"),
            LinkPolicy::Scratchpad => write!(f, "scratchpad"),
            LinkPolicy::Ramrodata => write!(f, "ramrodata"),
        }
    }
}

/// Inputs shared by every policy besides the role regions.
#[derive(Clone, Copy, Debug)]
pub struct LayoutContext<'a> {
    pub config: &'a LayoutConfig,
    pub harts: Harts,
}

impl<'a> LayoutContext<'a> {
    pub fn new(config: &'a LayoutConfig, harts: Harts) -> Self {
        LayoutContext { config, harts }
    }

    /// The devicetree's boot hart, falling back to the configured one.
    pub fn boot_hart(&self) -> u32 {
        self.harts.boot_hart.unwrap_or(self.config.boot_hart)
    }

    /// Hart ids in stack order: the boot hart first, then the rest ascending.
    pub fn stack_order(&self) -> Vec<u32> {
        let boot = self.boot_hart();
        std::iter::once(boot)
            .chain((0..self.harts.count).filter(|&hart| hart != boot))
            .take(self.harts.count.max(1) as usize)
            .collect()
    }

    pub fn variables(&self) -> HashMap<String, String> {
        let mut map = self.config.hash_map();
        map.insert("BOOT_HART".to_string(), format!("{}", self.boot_hart()));
        map.insert("HART_COUNT".to_string(), format!("{}", self.harts.count));
        map
    }
}

/// Where a class of sections is loaded from and runs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Binding<'a> {
    pub load: &'a MemoryRegion,
    pub run: &'a MemoryRegion,
}

impl<'a> Binding<'a> {
    pub fn in_place(region: &'a MemoryRegion) -> Self {
        Binding {
            load: region,
            run: region,
        }
    }

    pub fn copied(load: &'a MemoryRegion, run: &'a MemoryRegion) -> Self {
        Binding { load, run }
    }

    fn section(&self, name: &str) -> Section {
        Section::new(name, Some(self.load), self.run)
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Placement<'a> {
    pub code: Binding<'a>,
    pub rodata: Binding<'a>,
    pub itim: Binding<'a>,
    pub data: Binding<'a>,
    /// Zero-initialized sections have no load image.
    pub zero: &'a MemoryRegion,
}

fn assemble(placement: &Placement, context: &LayoutContext) -> LinkerScript {
    let align = context.config.data_align;
    let mut script = LinkerScript::new(context.variables());

    script.push(init(placement.code));
    script.push(text(placement.code));
    script.push(fini(placement.code));
    script.extend(init_arrays(placement.rodata));
    script.push(rodata(placement.rodata));
    script.push(itim(placement.itim));
    script.push(data(placement.data, align));
    script.push(bss(placement.zero, align));
    script.push(stack(placement.zero, context));
    script.push(heap(placement.zero, align));
    script
}

fn init(code: Binding) -> Section {
    code.section("init").commands([
        "KEEP (*(.text.metal.init.enter))",
        "KEEP (*(.text.metal.init.trapvec))",
        "KEEP (*(.text.metal.init.*))",
        "KEEP (*(SORT_NONE(.init)))",
        "KEEP (*(.text.libgloss.start))",
    ])
}

fn text(code: Binding) -> Section {
    code.section("text").commands([
        "*(.text.unlikely .text.unlikely.*)",
        "*(.text.startup .text.startup.*)",
        "*(.text .text.*)",
        "*(.gnu.linkonce.t.*)",
    ])
}

fn fini(code: Binding) -> Section {
    code.section("fini")
        .command("KEEP (*(SORT_NONE(.fini)))")
        .trailing([
            "PROVIDE (__etext = .);",
            "PROVIDE (_etext = .);",
            "PROVIDE (etext = .);",
        ])
}

fn init_arrays(rodata: Binding) -> Vec<Section> {
    vec![
        rodata.section("preinit_array").aligned(8).commands([
            "PROVIDE_HIDDEN (__preinit_array_start = .);",
            "KEEP (*(.preinit_array))",
            "PROVIDE_HIDDEN (__preinit_array_end = .);",
        ]),
        rodata.section("init_array").aligned(8).commands([
            "PROVIDE_HIDDEN (__init_array_start = .);",
            "KEEP (*(SORT_BY_INIT_PRIORITY(.init_array.*) SORT_BY_INIT_PRIORITY(.ctors.*)))",
            "KEEP (*(.init_array EXCLUDE_FILE (*crtbegin.o *crtbegin?.o *crtend.o *crtend?.o ) .ctors))",
            "PROVIDE_HIDDEN (__init_array_end = .);",
        ]),
        rodata.section("fini_array").aligned(8).commands([
            "PROVIDE_HIDDEN (__fini_array_start = .);",
            "KEEP (*(SORT_BY_INIT_PRIORITY(.fini_array.*) SORT_BY_INIT_PRIORITY(.dtors.*)))",
            "KEEP (*(.fini_array EXCLUDE_FILE (*crtbegin.o *crtbegin?.o *crtend.o *crtend?.o ) .dtors))",
            "PROVIDE_HIDDEN (__fini_array_end = .);",
        ]),
        rodata.section("ctors").commands([
            "KEEP (*crtbegin.o(.ctors))",
            "KEEP (*crtbegin?.o(.ctors))",
            "KEEP (*(EXCLUDE_FILE (*crtend.o *crtend?.o ) .ctors))",
            "KEEP (*(SORT(.ctors.*)))",
            "KEEP (*(.ctors))",
        ]),
        rodata.section("dtors").commands([
            "KEEP (*crtbegin.o(.dtors))",
            "KEEP (*crtbegin?.o(.dtors))",
            "KEEP (*(EXCLUDE_FILE (*crtend.o *crtend?.o ) .dtors))",
            "KEEP (*(SORT(.dtors.*)))",
            "KEEP (*(.dtors))",
        ]),
    ]
}

fn rodata(rodata: Binding) -> Section {
    rodata.section("rodata").commands([
        "*(.rdata)",
        "*(.rodata .rodata.*)",
        "*(.gnu.linkonce.r.*)",
        ". = ALIGN(8);",
        "*(.srodata.cst16)",
        "*(.srodata.cst8)",
        "*(.srodata.cst4)",
        "*(.srodata.cst2)",
        "*(.srodata .srodata.*)",
    ])
}

fn itim(itim: Binding) -> Section {
    itim.section("itim")
        .aligned(8)
        .command("*(.itim .itim.*)")
        .trailing([
            "PROVIDE( metal_segment_itim_source_start = LOADADDR(.itim) );",
            "PROVIDE( metal_segment_itim_target_start = ADDR(.itim) );",
            "PROVIDE( metal_segment_itim_target_end = ADDR(.itim) + SIZEOF(.itim) );",
        ])
}

fn data(data: Binding, align: u32) -> Section {
    data.section("data")
        .aligned(align)
        .commands([
            "*(.data .data.*)",
            "*(.gnu.linkonce.d.*)",
            ". = ALIGN(8);",
            "PROVIDE( __global_pointer$ = . + 0x800 );",
            "*(.sdata .sdata.* .sdata2.*)",
            "*(.gnu.linkonce.s.*)",
        ])
        .trailing([
            "PROVIDE( metal_segment_data_source_start = LOADADDR(.data) );",
            "PROVIDE( metal_segment_data_target_start = ADDR(.data) );",
            "PROVIDE( metal_segment_data_target_end = ADDR(.data) + SIZEOF(.data) );",
            "PROVIDE( _edata = . );",
            "PROVIDE( edata = . );",
        ])
}

fn bss(run: &MemoryRegion, align: u32) -> Section {
    Section::new("bss", None, run)
        .aligned(align)
        .commands([
            "*(.sbss*)",
            "*(.gnu.linkonce.sb.*)",
            "*(.bss .bss.*)",
            "*(.gnu.linkonce.b.*)",
            "*(COMMON)",
            ". = ALIGN(8);",
        ])
        .trailing([
            "PROVIDE( metal_segment_bss_target_start = ADDR(.bss) );",
            "PROVIDE( metal_segment_bss_target_end = ADDR(.bss) + SIZEOF(.bss) );",
            "PROVIDE( _end = . );",
            "PROVIDE( end = . );",
        ])
}

fn stack(run: &MemoryRegion, context: &LayoutContext) -> Section {
    let mut section = Section::new("stack", None, run)
        .aligned(context.config.data_align.max(16))
        .command("PROVIDE( metal_segment_stack_begin = . );");
    for (index, hart) in context.stack_order().into_iter().enumerate() {
        section = section.command(format!(". += __stack_size; /* Hart {} */", hart));
        if index == 0 {
            section = section.command("PROVIDE( _sp = . );");
        }
    }
    section.command("PROVIDE( metal_segment_stack_end = . );")
}

fn heap(run: &MemoryRegion, align: u32) -> Section {
    Section::new("heap", None, run).aligned(align).commands([
        "PROVIDE( metal_segment_heap_target_start = . );",
        ". += __heap_size;",
        "PROVIDE( metal_segment_heap_target_end = . );",
        "PROVIDE( _heap_end = . );",
    ])
}

#[cfg(test)]
pub(crate) mod test_roles {
    use crate::extract::{DTIM_TAG, ITIM_TAG, TESTRAM_TAG};
    use crate::memory::MemoryRegion;
    use crate::strategy::LayoutRoles;

    /// Flash, a separate ITIM and a DTIM, as on a rocket core.
    pub fn split() -> LayoutRoles {
        LayoutRoles::new(
            MemoryRegion::new(TESTRAM_TAG, "/soc/testram@20000000", 0x2000_0000, 0x10_0000)
                .as_flash(),
            MemoryRegion::new(ITIM_TAG, "/soc/itim@8000000", 0x800_0000, 0x4000).as_itim(),
            MemoryRegion::new(DTIM_TAG, "/soc/dtim@80000000", 0x8000_0000, 0x1_0000).as_ram(),
        )
    }

    /// The region and program header bindings of a section, as rendered.
    pub fn binding(script: &crate::LinkerScript, name: &str) -> String {
        let section = script.section(name).unwrap();
        match &section.load_region {
            Some(load) => format!(
                ">{} AT>{} :{}",
                section.run_region.name, load.name, section.program_header.name
            ),
            None => format!(">{} :{}", section.run_region.name, section.program_header.name),
        }
    }
}
