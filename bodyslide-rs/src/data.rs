use binrw::binrw;

// Both diff formats are little-endian throughout. BSD files hold a single
// diff and are named after it; OSD files bundle many diffs, each addressed by
// the record name that follows the last path separator in a `Data` entry.

#[binrw]
#[derive(Debug, Clone, PartialEq)]
pub struct BsdFile {
    #[bw(calc = diffs.len() as u32)]
    count: u32,
    #[br(count = count)]
    pub diffs: Vec<BsdDiff>,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdDiff {
    pub index: u32,
    pub offset: [f32; 3],
}

impl BsdFile {
    pub fn new(diffs: Vec<BsdDiff>) -> Self {
        BsdFile { diffs }
    }
}

#[binrw]
#[brw(magic = b"OSD\0")]
#[derive(Debug, Clone, PartialEq)]
pub struct OsdFile {
    pub version: u32,
    #[bw(calc = records.len() as u32)]
    record_count: u32,
    #[br(count = record_count)]
    pub records: Vec<OsdRecord>,
}

#[binrw]
#[derive(Debug, Clone, PartialEq)]
pub struct OsdRecord {
    #[bw(try_calc(u8::try_from(name.len())))]
    name_len: u8,
    #[br(count = name_len)]
    pub name: Vec<u8>,
    #[bw(try_calc(u16::try_from(diffs.len())))]
    diff_count: u16,
    #[br(count = diff_count)]
    pub diffs: Vec<OsdDiff>,
}

#[binrw]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsdDiff {
    pub index: u16,
    pub offset: [f32; 3],
}

impl OsdFile {
    pub const VERSION: u32 = 1;

    pub fn new(records: Vec<OsdRecord>) -> Self {
        OsdFile {
            version: Self::VERSION,
            records,
        }
    }

    pub fn record(&self, name: &str) -> Option<&OsdRecord> {
        self.records.iter().find(|r| r.name == name.as_bytes())
    }
}

impl OsdRecord {
    // Names are length-prefixed by a single byte. Writing a longer one fails.
    pub fn new(name: &str, diffs: Vec<OsdDiff>) -> Self {
        OsdRecord {
            name: name.as_bytes().to_vec(),
            diffs,
        }
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use binrw::{BinReaderExt, BinWriterExt};

    use super::*;

    #[test]
    fn osd_layout_matches_byte_for_byte() {
        let file = OsdFile::new(vec![OsdRecord::new(
            "Bust",
            vec![OsdDiff {
                index: 2,
                offset: [1.0, 0.0, 0.0],
            }],
        )]);

        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&file).unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(&bytes[0..4], b"OSD\0");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(bytes[12], 4);
        assert_eq!(&bytes[13..17], b"Bust");
        assert_eq!(&bytes[17..19], &1u16.to_le_bytes());
        assert_eq!(&bytes[19..21], &2u16.to_le_bytes());
        assert_eq!(bytes.len(), 21 + 12);

        let read: OsdFile = Cursor::new(bytes).read_le().unwrap();
        assert_eq!(read.record("Bust").unwrap().name(), "Bust");
    }

    #[test]
    fn bsd_rejects_truncated_input() {
        // Claims two diffs but only carries one.
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);

        let read: Result<BsdFile, _> = Cursor::new(bytes).read_le();
        assert!(read.is_err());
    }
}
