//! Offset-indexed archive container.
//!
//! Layout: `offset_0 .. offset_{n-1}, total_size, 0` as little-endian u32,
//! then the members back to back. `offset_i` is the absolute start of member
//! `i`; there are no names, sizes or checksums.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Non-fatal problems found while unpacking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerWarning {
    HeaderMismatch { first_offset: u32, header_end: u32 },
    TooFewOffsets { count: usize },
    StartOutOfRange { member: usize, start: u32, file_size: usize },
    EndClamped { member: usize, end: u32, file_size: usize },
    NegativeSize { member: usize, start: u32, end: u32 },
}

impl fmt::Display for ContainerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerWarning::HeaderMismatch {
                first_offset,
                header_end,
            } => write!(
                f,
                "first offset {} != end of offset table {}, extracting by offsets anyway",
                first_offset, header_end
            ),
            ContainerWarning::TooFewOffsets { count } => {
                write!(f, "offset table has {} entries, nothing to extract", count)
            }
            ContainerWarning::StartOutOfRange {
                member,
                start,
                file_size,
            } => write!(
                f,
                "member {}: start offset {} is past the end of the file ({} bytes), skipped",
                member + 1,
                start,
                file_size
            ),
            ContainerWarning::EndClamped {
                member,
                end,
                file_size,
            } => write!(
                f,
                "member {}: end offset {} is past the end of the file, clamped to {}",
                member + 1,
                end,
                file_size
            ),
            ContainerWarning::NegativeSize { member, start, end } => write!(
                f,
                "member {}: negative size (start={}, end={}), skipped",
                member + 1,
                start,
                end
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Zero-based slot in the offset table.
    pub index: usize,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Unpacked {
    pub offsets: Vec<u32>,
    pub members: Vec<Member>,
    pub warnings: Vec<ContainerWarning>,
}

impl Unpacked {
    /// Number of slots described by the offset table.
    pub fn slot_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn warn(&mut self, warning: ContainerWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

pub struct Archive;

impl Archive {
    fn read_offsets(bytes: &[u8]) -> Result<Vec<u32>> {
        let mut rdr = Cursor::new(bytes);
        let mut offsets = vec![];
        loop {
            let val = rdr.read_u32::<LittleEndian>().map_err(|_| {
                Error::Container(format!(
                    "unexpected end of file at 0x{:X} while reading the offset table",
                    rdr.position()
                ))
            })?;
            if val == 0 {
                break;
            }
            offsets.push(val);
        }
        Ok(offsets)
    }

    pub fn read(bytes: &[u8]) -> Result<Unpacked> {
        let offsets = Self::read_offsets(bytes)?;
        let header_end = 4 * (offsets.len() as u32 + 1);
        let file_size = bytes.len();

        let mut unpacked = Unpacked {
            offsets: offsets.clone(),
            ..Default::default()
        };

        if offsets.len() < 2 {
            unpacked.warn(ContainerWarning::TooFewOffsets {
                count: offsets.len(),
            });
            return Ok(unpacked);
        }

        if offsets[0] != header_end {
            unpacked.warn(ContainerWarning::HeaderMismatch {
                first_offset: offsets[0],
                header_end,
            });
        }

        for (member, pair) in offsets.windows(2).enumerate() {
            let (start, mut end) = (pair[0], pair[1]);
            if start as usize > file_size {
                unpacked.warn(ContainerWarning::StartOutOfRange {
                    member,
                    start,
                    file_size,
                });
                continue;
            }
            if end as usize > file_size {
                unpacked.warn(ContainerWarning::EndClamped {
                    member,
                    end,
                    file_size,
                });
                end = file_size as u32;
            }
            if end < start {
                unpacked.warn(ContainerWarning::NegativeSize { member, start, end });
                continue;
            }

            unpacked.members.push(Member {
                index: member,
                data: bytes[start as usize..end as usize].to_vec(),
            });
        }

        Ok(unpacked)
    }

    /// Offset table for members of the given sizes, sentinel included.
    pub fn header(sizes: &[usize]) -> Result<Vec<u32>> {
        let header_size = 4 * (sizes.len() + 2);
        let mut offsets = Vec::with_capacity(sizes.len() + 2);
        let mut cur = header_size;
        for size in sizes {
            offsets.push(Self::to_offset(cur)?);
            cur += size;
        }
        offsets.push(Self::to_offset(cur)?);
        offsets.push(0);
        Ok(offsets)
    }

    fn to_offset(pos: usize) -> Result<u32> {
        u32::try_from(pos).map_err(|_| Error::Overflow {
            what: "archive offset".into(),
            needed: pos,
            limit: u32::MAX as usize,
        })
    }

    pub fn write<W: Write>(members: &[impl AsRef<[u8]>], mut writer: W) -> Result<()> {
        let sizes: Vec<usize> = members.iter().map(|m| m.as_ref().len()).collect();
        for offset in Self::header(&sizes)? {
            writer.write_u32::<LittleEndian>(offset)?;
        }
        for member in members {
            writer.write_all(member.as_ref())?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Output name for a member: archive stem plus a 1-based, zero-padded index.
pub fn member_name(stem: &str, index: usize, count: usize) -> String {
    let width = count.to_string().len().max(3);
    format!("{}{:0width$}", stem, index + 1, width = width)
}

#[derive(Debug, Default)]
pub struct UnpackReport {
    pub written: Vec<PathBuf>,
    pub warnings: Vec<ContainerWarning>,
}

pub fn unpack_file(path: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Result<UnpackReport> {
    let path = path.as_ref();
    let out_dir = out_dir.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::from(e).in_file(path))?;
    let unpacked = Archive::read(&bytes).map_err(|e| e.in_file(path))?;

    fs::create_dir_all(out_dir)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let count = unpacked.slot_count();
    let mut written = Vec::with_capacity(unpacked.members.len());
    for member in &unpacked.members {
        let out_path = out_dir.join(member_name(&stem, member.index, count));
        fs::write(&out_path, &member.data).map_err(|e| Error::from(e).in_file(&out_path))?;
        log::info!("wrote {} ({} bytes)", out_path.display(), member.data.len());
        written.push(out_path);
    }
    log::info!(
        "extracted {} of {} members to {}",
        written.len(),
        count,
        out_dir.display()
    );

    Ok(UnpackReport {
        written,
        warnings: unpacked.warnings,
    })
}

fn trailing_number(name: &str) -> Option<u64> {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    // saturate absurdly long digit runs rather than fail
    Some(stem[stem.len() - digits..].parse().unwrap_or(u64::MAX))
}

/// Container order: members with a trailing number ascending by that number,
/// then the rest by name.
pub fn order_members(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| match (trailing_number(a), trailing_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    names
}

/// Pack every regular file directly inside `dir`. Returns the member order.
pub fn pack_dir(dir: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::Container(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut names = vec![];
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    if names.is_empty() {
        return Err(Error::Container(format!(
            "{} has no files to pack",
            dir.display()
        )));
    }

    let ordered = order_members(names);
    let members = ordered
        .iter()
        .map(|name| {
            let p = dir.join(name);
            fs::read(&p).map_err(|e| Error::from(e).in_file(&p))
        })
        .collect::<Result<Vec<_>>>()?;

    let output = output.as_ref();
    let file = File::create(output).map_err(|e| Error::from(e).in_file(output))?;
    Archive::write(&members, BufWriter::new(file))?;

    let total: usize = members.iter().map(Vec::len).sum();
    log::info!(
        "packed {} members into {} ({} bytes of data)",
        members.len(),
        output.display(),
        total
    );
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header_bytes(offsets: &[u32]) -> Vec<u8> {
        offsets.iter().flat_map(|o| o.to_le_bytes()).collect()
    }

    #[test]
    fn pack_two_members() {
        let mut out = vec![];
        Archive::write(&[vec![1u8; 4], vec![2u8; 6]], &mut out).unwrap();
        assert_eq!(out.len(), 26);
        assert_eq!(&out[..16], &header_bytes(&[16, 20, 26, 0])[..]);
        assert_eq!(&out[16..20], &[1, 1, 1, 1]);
        assert_eq!(&out[20..], &[2; 6]);
    }

    #[test]
    fn degenerate_empty_member() {
        let mut bytes = header_bytes(&[12, 12, 20, 0]);
        bytes.extend_from_slice(&[0xAA; 4]);
        assert_eq!(bytes.len(), 20);

        let unpacked = Archive::read(&bytes).unwrap();
        let sizes: Vec<usize> = unpacked.members.iter().map(|m| m.data.len()).collect();
        assert_eq!(sizes, vec![0, 8]);
        assert_eq!(
            unpacked.warnings,
            vec![ContainerWarning::HeaderMismatch {
                first_offset: 12,
                header_end: 16
            }]
        );
    }

    #[test]
    fn out_of_range_offsets_are_lenient() {
        let mut bytes = header_bytes(&[20, 24, 40, 50, 0]);
        bytes.extend_from_slice(&[7; 8]);
        assert_eq!(bytes.len(), 28);

        let unpacked = Archive::read(&bytes).unwrap();
        assert_eq!(unpacked.slot_count(), 3);
        assert_eq!(unpacked.members.len(), 2);
        assert_eq!(unpacked.members[0].data.len(), 4);
        assert_eq!(unpacked.members[1].index, 1);
        assert_eq!(unpacked.members[1].data.len(), 4);
        assert_eq!(
            unpacked.warnings,
            vec![
                ContainerWarning::EndClamped {
                    member: 1,
                    end: 40,
                    file_size: 28
                },
                ContainerWarning::StartOutOfRange {
                    member: 2,
                    start: 40,
                    file_size: 28
                },
            ]
        );
    }

    #[test]
    fn negative_size_is_skipped() {
        let mut bytes = header_bytes(&[16, 20, 18, 0]);
        bytes.extend_from_slice(&[0; 8]);
        let unpacked = Archive::read(&bytes).unwrap();
        assert_eq!(unpacked.members.len(), 1);
        assert!(matches!(
            unpacked.warnings[0],
            ContainerWarning::NegativeSize { member: 1, .. }
        ));
    }

    #[test]
    fn too_few_offsets_is_empty() {
        let bytes = header_bytes(&[8, 0]);
        let unpacked = Archive::read(&bytes).unwrap();
        assert!(unpacked.members.is_empty());
        assert_eq!(
            unpacked.warnings,
            vec![ContainerWarning::TooFewOffsets { count: 1 }]
        );
    }

    #[test]
    fn unterminated_table_is_fatal() {
        let bytes = header_bytes(&[12, 16]);
        assert!(matches!(Archive::read(&bytes), Err(Error::Container(_))));
    }

    #[test]
    fn member_names_are_padded() {
        assert_eq!(member_name("Event", 0, 12), "Event001");
        assert_eq!(member_name("Event", 1233, 1500), "Event1234");
    }

    #[test]
    fn ordering_puts_numbered_first() {
        let names = ["b.txt", "s10", "s2", "a", "x2", "s001"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            order_members(names),
            vec!["s001", "s2", "x2", "s10", "a", "b.txt"]
        );
    }

    #[test]
    fn pack_unpack_repack_is_identical() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("Event001"), b"first").unwrap();
        fs::write(src.path().join("Event002"), b"").unwrap();
        fs::write(src.path().join("Event003"), b"third member").unwrap();

        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("Event.bin");
        pack_dir(src.path(), &archive).unwrap();

        let out = work.path().join("unpacked");
        let report = unpack_file(&archive, &out).unwrap();
        assert_eq!(report.written.len(), 3);
        assert!(report.warnings.is_empty());
        assert_eq!(fs::read(out.join("Event003")).unwrap(), b"third member");

        let repacked = work.path().join("Event2.bin");
        pack_dir(&out, &repacked).unwrap();
        assert_eq!(fs::read(&archive).unwrap(), fs::read(&repacked).unwrap());
    }

    #[test]
    fn packing_an_empty_directory_fails() {
        let src = tempfile::tempdir().unwrap();
        let out = src.path().join("out.bin");
        assert!(matches!(
            pack_dir(src.path().join("missing"), &out),
            Err(Error::Container(_))
        ));
        assert!(matches!(pack_dir(src.path(), &out), Err(Error::Container(_))));
    }
}
