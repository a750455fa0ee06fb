use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File},
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use binrw::{BinReaderExt, BinWriterExt};
use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::data::{BsdDiff, BsdFile, OsdDiff, OsdFile, OsdRecord};

#[derive(Error, Debug)]
pub enum DiffDataError {
    #[error("could not open diff file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed diff file {}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: binrw::Error,
    },
}

/// Sparse per-vertex offsets for one named diff, bound to the shape target
/// it was authored against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffSet {
    pub target: String,
    pub diffs: BTreeMap<u16, Vec3>,
}

/// OSD loads are batched per backing file: file -> record name -> target.
pub type OsdNameMap = BTreeMap<PathBuf, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default)]
pub struct DiffDataSets {
    sets: HashMap<String, DiffSet>,
}

impl DiffDataSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }

    pub fn contains(&self, set: &str) -> bool {
        self.sets.contains_key(set)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn get(&self, set: &str) -> Option<&DiffSet> {
        self.sets.get(set)
    }

    pub fn insert(&mut self, set: &str, target: &str, diffs: BTreeMap<u16, Vec3>) {
        self.sets.insert(
            set.to_owned(),
            DiffSet {
                target: target.to_owned(),
                diffs,
            },
        );
    }

    pub fn remove(&mut self, set: &str) -> Option<DiffSet> {
        self.sets.remove(set)
    }

    /// Returns the named diff only when it was loaded for `target`.
    pub fn target_match(&self, set: &str, target: &str) -> Option<&BTreeMap<u16, Vec3>> {
        self.sets
            .get(set)
            .filter(|data| data.target == target)
            .map(|data| &data.diffs)
    }

    /// Loads a single binary diff set. A file that cannot be opened leaves
    /// the store untouched.
    pub fn load_set(&mut self, set: &str, target: &str, path: &Path) -> Result<(), DiffDataError> {
        let file = File::open(path).map_err(|source| DiffDataError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let read: BsdFile = reader.read_le().map_err(|source| DiffDataError::Format {
            path: path.to_owned(),
            source,
        })?;

        let mut diffs = BTreeMap::new();
        for diff in read.diffs {
            match u16::try_from(diff.index) {
                Ok(index) => {
                    diffs.insert(index, Vec3::from_array(diff.offset));
                }
                Err(_) => log::warn!(
                    "Dropping out of range index {} in {}",
                    diff.index,
                    path.display()
                ),
            }
        }

        self.insert(set, target, diffs);
        Ok(())
    }

    /// Loads every requested record, opening each backing file once. Files
    /// that fail to load are logged and skipped so the rest still come in.
    pub fn load_data(&mut self, names: &OsdNameMap) {
        for (path, records) in names {
            let read = match read_osd(path) {
                Ok(read) => read,
                Err(err) => {
                    log::debug!("Skipping OSD data: {}", err);
                    continue;
                }
            };

            for (record_name, target) in records {
                match read.record(record_name) {
                    Some(record) => {
                        let diffs = record
                            .diffs
                            .iter()
                            .map(|d| (d.index, Vec3::from_array(d.offset)))
                            .collect();
                        self.insert(record_name, target, diffs);
                    }
                    None => log::debug!(
                        "No record '{}' in {}",
                        record_name,
                        path.display()
                    ),
                }
            }
        }
    }

    pub fn save_set(&self, set: &str, target: &str, path: &Path) -> Result<(), DiffDataError> {
        let diffs = self
            .target_match(set, target)
            .map(|data| {
                data.iter()
                    .map(|(index, offset)| BsdDiff {
                        index: *index as u32,
                        offset: offset.to_array(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut cursor = Cursor::new(Vec::new());
        cursor
            .write_le(&BsdFile::new(diffs))
            .map_err(|source| DiffDataError::Format {
                path: path.to_owned(),
                source,
            })?;
        write_bytes(path, cursor.into_inner())
    }

    /// Writes the named sets into one OSD file, each under its own name.
    pub fn save_data<'a>(
        &self,
        sets: impl IntoIterator<Item = &'a str>,
        path: &Path,
    ) -> Result<(), DiffDataError> {
        let records = sets
            .into_iter()
            .filter_map(|name| {
                self.sets.get(name).map(|data| {
                    let diffs = data
                        .diffs
                        .iter()
                        .map(|(index, offset)| OsdDiff {
                            index: *index,
                            offset: offset.to_array(),
                        })
                        .collect();
                    OsdRecord::new(name, diffs)
                })
            })
            .collect();

        let mut cursor = Cursor::new(Vec::new());
        cursor
            .write_le(&OsdFile::new(records))
            .map_err(|source| DiffDataError::Format {
                path: path.to_owned(),
                source,
            })?;
        write_bytes(path, cursor.into_inner())
    }

    pub fn apply_diff(&self, set: &str, target: &str, percent: f32, verts: &mut [Vec3]) {
        if percent == 0.0 {
            return;
        }

        let Some(data) = self.target_match(set, target) else {
            return;
        };

        for (index, offset) in data {
            if let Some(vert) = verts.get_mut(*index as usize) {
                *vert += *offset * percent;
            }
        }
    }

    // UV diffs are stored the same way, with only x and y carrying data.
    pub fn apply_uv_diff(&self, set: &str, target: &str, percent: f32, uvs: &mut [Vec2]) {
        if percent == 0.0 {
            return;
        }

        let Some(data) = self.target_match(set, target) else {
            return;
        };

        for (index, offset) in data {
            if let Some(uv) = uvs.get_mut(*index as usize) {
                *uv += offset.truncate() * percent;
            }
        }
    }

    // A clamp diff holds the bound itself rather than an offset, so every
    // vertex it references is pinned there no matter where earlier diffs
    // moved it.
    pub fn apply_clamp(&self, set: &str, target: &str, verts: &mut [Vec3]) {
        let Some(data) = self.target_match(set, target) else {
            return;
        };

        for (index, bound) in data {
            if let Some(vert) = verts.get_mut(*index as usize) {
                *vert = *bound;
            }
        }
    }

    /// Merges the indices touched by `set` into `out`, keeping it sorted
    /// and free of duplicates.
    pub fn get_diff_indices(&self, set: &str, target: &str, out: &mut Vec<u16>) {
        let Some(data) = self.target_match(set, target) else {
            return;
        };

        out.extend(data.keys().copied());
        out.sort_unstable();
        out.dedup();
    }
}

fn read_osd(path: &Path) -> Result<OsdFile, DiffDataError> {
    let file = File::open(path).map_err(|source| DiffDataError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    reader.read_le().map_err(|source| DiffDataError::Format {
        path: path.to_owned(),
        source,
    })
}

fn write_bytes(path: &Path, bytes: Vec<u8>) -> Result<(), DiffDataError> {
    fs::write(path, bytes).map_err(|source| DiffDataError::Io {
        path: path.to_owned(),
        source,
    })
}
