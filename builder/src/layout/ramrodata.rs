// Licensed under the Apache-2.0 license

use super::{Binding, Placement};
use crate::strategy::LayoutRoles;

/// Default placement, except read-only data lives in the rodata region.
pub(super) fn placement(roles: &LayoutRoles) -> Placement<'_> {
    Placement {
        code: Binding::in_place(&roles.rom),
        rodata: Binding::in_place(&roles.rodata),
        itim: Binding::copied(&roles.rom, &roles.itim),
        data: Binding::copied(&roles.rom, &roles.ram),
        zero: &roles.ram,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_roles::{binding, split};
    use crate::extract::Harts;
    use crate::layout::{LayoutContext, LinkPolicy};
    use ldgen_config::LayoutConfig;

    #[test]
    fn test_rodata_in_ram() {
        let config = LayoutConfig::default();
        let context = LayoutContext::new(&config, Harts::default());
        let script = LinkPolicy::Ramrodata.build(&split(), &context);

        assert_eq!(binding(&script, "text"), ">flash AT>flash :flash");
        for name in ["preinit_array", "ctors", "rodata"] {
            assert_eq!(binding(&script, name), ">ram AT>ram :ram", "{}", name);
        }
        assert_eq!(binding(&script, "data"), ">ram AT>flash :ram_init");

        let phdrs: Vec<&str> = script.phdrs().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(phdrs, vec!["flash", "ram", "itim_init", "ram_init", "ram_bss"]);
    }
}
