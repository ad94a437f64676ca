// Licensed under the Apache-2.0 license

use crate::header::{
    FdtHeader, FDT_BEGIN_NODE, FDT_END, FDT_END_NODE, FDT_MAGIC, FDT_NOP, FDT_PROP, HEADER_SIZE,
};
use crate::{DeviceTree, FdtError, FdtResult, NodeId};
use log::debug;
use zerocopy::FromBytes;

struct StructReader<'a> {
    blob: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> StructReader<'a> {
    fn u32(&mut self) -> FdtResult<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn bytes(&mut self, len: usize) -> FdtResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.end)
            .ok_or(FdtError::Truncated(self.pos))?;
        let bytes = &self.blob[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn align(&mut self) {
        self.pos = self.pos.next_multiple_of(4);
    }

    fn cstr(&mut self) -> FdtResult<&'a str> {
        let start = self.pos;
        let window = &self.blob[start..self.end];
        let len = window
            .iter()
            .position(|&b| b == 0)
            .ok_or(FdtError::Truncated(start))?;
        let s = std::str::from_utf8(&window[..len]).map_err(|_| FdtError::InvalidString(start))?;
        self.pos = start + len + 1;
        self.align();
        Ok(s)
    }
}

fn string_at(strings: &[u8], offset: usize) -> FdtResult<&str> {
    let window = strings.get(offset..).ok_or(FdtError::InvalidString(offset))?;
    let len = window
        .iter()
        .position(|&b| b == 0)
        .ok_or(FdtError::InvalidString(offset))?;
    std::str::from_utf8(&window[..len]).map_err(|_| FdtError::InvalidString(offset))
}

fn block(blob: &[u8], offset: u32, size: u32) -> FdtResult<(usize, usize)> {
    let start = offset as usize;
    let end = start
        .checked_add(size as usize)
        .filter(|&e| e <= blob.len())
        .ok_or(FdtError::Truncated(start))?;
    Ok((start, end))
}

pub(crate) fn parse_blob(blob: &[u8]) -> FdtResult<DeviceTree> {
    if blob.len() < HEADER_SIZE {
        return Err(FdtError::TooSmall(blob.len()));
    }
    let (header, _) =
        FdtHeader::read_from_prefix(blob).map_err(|_| FdtError::TooSmall(blob.len()))?;
    if header.magic.get() != FDT_MAGIC {
        return Err(FdtError::BadMagic(header.magic.get()));
    }
    if !header.verify() {
        return Err(FdtError::UnsupportedVersion {
            version: header.version.get(),
            last_comp_version: header.last_comp_version.get(),
        });
    }
    if header.totalsize.get() as usize > blob.len() {
        return Err(FdtError::Truncated(blob.len()));
    }
    let blob = &blob[..header.totalsize.get() as usize];

    let (strings_start, strings_end) = block(
        blob,
        header.off_dt_strings.get(),
        header.size_dt_strings.get(),
    )?;
    let strings = &blob[strings_start..strings_end];
    let (struct_start, struct_end) = block(
        blob,
        header.off_dt_struct.get(),
        header.size_dt_struct.get(),
    )?;

    let mut tree = DeviceTree::new();
    tree.set_boot_cpuid_phys(header.boot_cpuid_phys.get());

    let mut reader = StructReader {
        blob,
        pos: struct_start,
        end: struct_end,
    };
    // Stack of open nodes; the first BEGIN_NODE is the root itself.
    let mut open: Vec<NodeId> = Vec::new();
    loop {
        let offset = reader.pos;
        match reader.u32()? {
            FDT_BEGIN_NODE => {
                let name = reader.cstr()?;
                let id = match open.last() {
                    None => DeviceTree::ROOT,
                    Some(&parent) => tree.add_node(parent, name),
                };
                open.push(id);
            }
            FDT_END_NODE => {
                if open.pop().is_none() {
                    return Err(FdtError::UnexpectedToken {
                        token: FDT_END_NODE,
                        offset,
                    });
                }
            }
            FDT_PROP => {
                let len = reader.u32()? as usize;
                let nameoff = reader.u32()? as usize;
                let value = reader.bytes(len)?;
                reader.align();
                let name = string_at(strings, nameoff)?;
                let Some(&node) = open.last() else {
                    return Err(FdtError::UnexpectedToken {
                        token: FDT_PROP,
                        offset,
                    });
                };
                tree.set_property(node, name, value);
            }
            FDT_NOP => {}
            FDT_END => {
                if !open.is_empty() {
                    return Err(FdtError::UnexpectedToken {
                        token: FDT_END,
                        offset,
                    });
                }
                break;
            }
            token => return Err(FdtError::UnexpectedToken { token, offset }),
        }
    }
    debug!(
        "Parsed devicetree: {} nodes, version {}",
        tree.nodes().len(),
        header.version.get()
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FDT_VERSION;

    fn sample_tree() -> DeviceTree {
        let mut dt = DeviceTree::new();
        dt.set_u32s(DeviceTree::ROOT, "#address-cells", &[1]);
        dt.set_u32s(DeviceTree::ROOT, "#size-cells", &[1]);
        dt.set_string(DeviceTree::ROOT, "model", "test,board");
        let soc = dt.add_node(DeviceTree::ROOT, "soc");
        let dtim = dt.add_node(soc, "dtim@80000000");
        dt.set_string(dtim, "compatible", "sifive,dtim0");
        dt.set_u32s(dtim, "reg", &[0x8000_0000, 0x1_0000]);
        let cpus = dt.add_node(DeviceTree::ROOT, "cpus");
        let cpu = dt.add_node(cpus, "cpu@0");
        dt.set_string(cpu, "device_type", "cpu");
        dt.set_property(cpu, "interrupt-controller", Vec::new());
        dt.set_boot_cpuid_phys(0);
        dt
    }

    #[test]
    fn test_blob_roundtrip() {
        let dt = sample_tree();
        let blob = dt.to_blob();
        let parsed = DeviceTree::from_blob(&blob).unwrap();

        let paths = |t: &DeviceTree| t.nodes().iter().map(|n| n.path()).collect::<Vec<_>>();
        assert_eq!(paths(&dt), paths(&parsed));
        for (a, b) in dt.nodes().iter().zip(parsed.nodes().iter()) {
            assert_eq!(
                a.properties().collect::<Vec<_>>(),
                b.properties().collect::<Vec<_>>()
            );
        }
        let dtim = parsed.find_path("/soc/dtim@80000000").unwrap();
        assert_eq!(dtim.compatible(), vec!["sifive,dtim0"]);
        assert!(parsed
            .find_path("/cpus/cpu@0")
            .unwrap()
            .field_exists("interrupt-controller"));
    }

    #[test]
    fn test_bad_magic() {
        let mut blob = sample_tree().to_blob();
        blob[0] = 0;
        assert!(matches!(
            DeviceTree::from_blob(&blob),
            Err(FdtError::BadMagic(_))
        ));
    }

    #[test]
    fn test_too_small() {
        assert_eq!(
            DeviceTree::from_blob(&[0xd0, 0x0d]).unwrap_err(),
            FdtError::TooSmall(2)
        );
    }

    #[test]
    fn test_truncated() {
        let blob = sample_tree().to_blob();
        let err = DeviceTree::from_blob(&blob[..blob.len() - 8]).unwrap_err();
        assert!(matches!(err, FdtError::Truncated(_)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut blob = sample_tree().to_blob();
        // last_comp_version lives at byte offset 24
        blob[24..28].copy_from_slice(&(FDT_VERSION + 1).to_be_bytes());
        assert!(matches!(
            DeviceTree::from_blob(&blob),
            Err(FdtError::UnsupportedVersion { .. })
        ));
    }
}
