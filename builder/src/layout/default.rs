// Licensed under the Apache-2.0 license

use super::{Binding, Placement};
use crate::strategy::LayoutRoles;

/// Code and read-only data execute in place from rom, data is copied from
/// rom into ram at startup.
pub(super) fn placement(roles: &LayoutRoles) -> Placement<'_> {
    Placement {
        code: Binding::in_place(&roles.rom),
        rodata: Binding::in_place(&roles.rom),
        itim: Binding::copied(&roles.rom, &roles.itim),
        data: Binding::copied(&roles.rom, &roles.ram),
        zero: &roles.ram,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_roles::{binding, split};
    use crate::extract::{Harts, TESTRAM_TAG};
    use crate::layout::{LayoutContext, LinkPolicy};
    use crate::memory::MemoryRegion;
    use crate::strategy::LayoutRoles;
    use ldgen_config::LayoutConfig;

    #[test]
    fn test_bindings() {
        let config = LayoutConfig::default();
        let context = LayoutContext::new(&config, Harts::default());
        let script = LinkPolicy::Default.build(&split(), &context);

        for name in ["init", "text", "fini", "init_array", "rodata"] {
            assert_eq!(binding(&script, name), ">flash AT>flash :flash", "{}", name);
        }
        assert_eq!(binding(&script, "itim"), ">itim AT>flash :itim_init");
        assert_eq!(binding(&script, "data"), ">ram AT>flash :ram_init");
        assert_eq!(binding(&script, "bss"), ">ram :ram_bss");
        assert_eq!(binding(&script, "heap"), ">ram :ram_bss");

        let memories: Vec<&str> = script.memories().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(memories, vec!["flash", "itim", "ram"]);
        let phdrs: Vec<&str> = script.phdrs().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(phdrs, vec!["flash", "itim_init", "ram_init", "ram_bss"]);
    }

    #[test]
    fn test_single_region() {
        let config = LayoutConfig::default();
        let context = LayoutContext::new(&config, Harts::default());
        let testram = MemoryRegion::new(TESTRAM_TAG, "/soc/testram@80000000", 0x8000_0000, 0x4000);
        let script = LinkPolicy::Default.build(&LayoutRoles::single(&testram), &context);

        assert_eq!(script.memories().len(), 1);
        assert_eq!(binding(&script, "data"), ">ram AT>ram :ram");
        let phdrs: Vec<&str> = script.phdrs().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(phdrs, vec!["ram", "ram_bss"]);
    }
}
