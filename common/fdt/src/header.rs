// Licensed under the Apache-2.0 license

use zerocopy::byteorder::{BigEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const FDT_MAGIC: u32 = 0xd00d_feed;
pub const FDT_VERSION: u32 = 17;
pub const FDT_LAST_COMP_VERSION: u32 = 16;

pub(crate) const FDT_BEGIN_NODE: u32 = 0x1;
pub(crate) const FDT_END_NODE: u32 = 0x2;
pub(crate) const FDT_PROP: u32 = 0x3;
pub(crate) const FDT_NOP: u32 = 0x4;
pub(crate) const FDT_END: u32 = 0x9;

/// On-disk header of a flattened devicetree blob. All fields are big-endian.
#[repr(C)]
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct FdtHeader {
    pub magic: U32<BigEndian>,
    pub totalsize: U32<BigEndian>,
    pub off_dt_struct: U32<BigEndian>,
    pub off_dt_strings: U32<BigEndian>,
    pub off_mem_rsvmap: U32<BigEndian>,
    pub version: U32<BigEndian>,
    pub last_comp_version: U32<BigEndian>,
    pub boot_cpuid_phys: U32<BigEndian>,
    pub size_dt_strings: U32<BigEndian>,
    pub size_dt_struct: U32<BigEndian>,
}

pub(crate) const HEADER_SIZE: usize = core::mem::size_of::<FdtHeader>();

impl FdtHeader {
    pub fn verify(&self) -> bool {
        self.magic.get() == FDT_MAGIC
            && self.version.get() >= FDT_LAST_COMP_VERSION
            && self.last_comp_version.get() <= FDT_VERSION
    }
}
