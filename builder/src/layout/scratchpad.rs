// Licensed under the Apache-2.0 license

use super::{Binding, Placement};
use crate::strategy::LayoutRoles;

/// Everything is loaded directly into ram; rom is never referenced.
pub(super) fn placement(roles: &LayoutRoles) -> Placement<'_> {
    Placement {
        code: Binding::in_place(&roles.ram),
        rodata: Binding::in_place(&roles.ram),
        itim: Binding::copied(&roles.ram, &roles.itim),
        data: Binding::in_place(&roles.ram),
        zero: &roles.ram,
    }
}
