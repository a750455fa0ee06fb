use std::path::{Path, PathBuf};

use crate::{
    diff::{DiffDataSets, OsdNameMap},
    slider::{DiffFormat, DiffInfo},
};

use super::SliderSet;

/// Where a diff entry's data lives on disk once its folders were searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLocation {
    Bsd(PathBuf),
    Osd { path: PathBuf, record: String },
}

/// Returns `base/folder/file` for the first folder in which it exists.
pub fn find_in_folders(base: &Path, folders: &[String], file_name: &str) -> Option<PathBuf> {
    folders
        .iter()
        .map(|folder| base.join(folder).join(file_name))
        .find(|path| path.exists())
}

impl SliderSet {
    /// Resolves one diff entry of `shape` against this set's base path and
    /// folders. When no folder holds the file the base path itself is
    /// returned, so the load is still attempted and fails in the store.
    pub fn locate_diff(&self, shape: &str, diff: &DiffInfo) -> Option<DiffLocation> {
        let format = diff.format()?;

        let local_folder;
        let folders = if diff.local {
            local_folder = [self.data_folder.clone()];
            &local_folder[..]
        } else {
            self.shape_data_folders(shape)
        };

        let file_name = match &format {
            DiffFormat::Bsd => diff.file_name.as_str(),
            DiffFormat::Osd { file, .. } => file.as_str(),
        };

        let path = find_in_folders(&self.base_data_path, folders, file_name).unwrap_or_else(|| {
            log::debug!(
                "'{}' for '{}' not found in any data folder of shape '{}'",
                file_name,
                diff.data_name,
                shape
            );
            self.base_data_path.clone()
        });

        Some(match format {
            DiffFormat::Bsd => DiffLocation::Bsd(path),
            DiffFormat::Osd { record, .. } => DiffLocation::Osd { path, record },
        })
    }
}

/// Collects diff loads for one store. BSD files are read as they come in,
/// OSD records are grouped per file and read in one go by `finish`.
#[derive(Debug, Default)]
pub(crate) struct DiffBatch {
    osd_names: OsdNameMap,
}

impl DiffBatch {
    pub fn load(&mut self, store: &mut DiffDataSets, diff: &DiffInfo, location: DiffLocation) {
        match location {
            DiffLocation::Bsd(path) => {
                if let Err(err) = store.load_set(&diff.data_name, &diff.target_name, &path) {
                    log::debug!("Skipping BSD data '{}': {}", diff.data_name, err);
                }
            }
            DiffLocation::Osd { path, record } => {
                self.osd_names
                    .entry(path)
                    .or_default()
                    .insert(record, diff.target_name.clone());
            }
        }
    }

    pub fn finish(self, store: &mut DiffDataSets) {
        store.load_data(&self.osd_names);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn first_existing_folder_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("F1")).unwrap();
        fs::create_dir_all(dir.path().join("F2")).unwrap();
        fs::create_dir_all(dir.path().join("F3")).unwrap();
        fs::write(dir.path().join("F2").join("Bust.bsd"), b"").unwrap();
        fs::write(dir.path().join("F3").join("Bust.bsd"), b"").unwrap();

        let folders = vec!["F1".to_owned(), "F2".to_owned(), "F3".to_owned()];
        assert_eq!(
            find_in_folders(dir.path(), &folders, "Bust.bsd"),
            Some(dir.path().join("F2").join("Bust.bsd"))
        );
        assert_eq!(find_in_folders(dir.path(), &folders, "Belly.bsd"), None);
    }

    #[test]
    fn local_entries_only_search_the_set_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Shared")).unwrap();
        fs::create_dir_all(dir.path().join("Mine")).unwrap();
        fs::write(dir.path().join("Shared").join("Body.osd"), b"").unwrap();
        fs::write(dir.path().join("Mine").join("Body.osd"), b"").unwrap();

        let mut set = SliderSet::new("Outfit");
        set.data_folder = "Mine".to_owned();
        set.base_data_path = dir.path().to_owned();
        set.set_shape_data_folders("Body", vec!["Shared".to_owned()]);

        let shared = DiffInfo::new("Body", "Bust", "Body.osd/Bust", false);
        let local = DiffInfo::new("Body", "Bust", "Body.osd/Bust", true);

        assert_eq!(
            set.locate_diff("Body", &shared),
            Some(DiffLocation::Osd {
                path: dir.path().join("Shared").join("Body.osd"),
                record: "Bust".to_owned(),
            })
        );
        assert_eq!(
            set.locate_diff("Body", &local),
            Some(DiffLocation::Osd {
                path: dir.path().join("Mine").join("Body.osd"),
                record: "Bust".to_owned(),
            })
        );
    }

    #[test]
    fn unresolved_entries_fall_back_to_the_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = SliderSet::new("Outfit");
        set.base_data_path = dir.path().to_owned();
        set.set_shape_data_folders("Body", vec!["Nowhere".to_owned()]);

        let diff = DiffInfo::new("Body", "Bust", "Bust.bsd", false);
        assert_eq!(
            set.locate_diff("Body", &diff),
            Some(DiffLocation::Bsd(dir.path().to_owned()))
        );
    }
}
