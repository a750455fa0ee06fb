use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::{
    path::to_os_slashes,
    schema::{self, attr, child_elements, int_attr, set_attr, text, CURRENT_VERSION},
    set::SliderSet,
    SliderSetError,
};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A slider-set document held in memory. Sets are stored as elements and only
/// turned into `SliderSet`s on request.
#[derive(Debug, Clone)]
pub struct SliderSetFile {
    path: PathBuf,
    version: u32,
    root: Element,
    sets_in_file: BTreeSet<String>,
    sets_order: Vec<String>,
}

impl SliderSetFile {
    /// Starts an empty document at the current version.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut root = Element::new(schema::SLIDER_SET_INFO);
        set_attr(&mut root, "version", CURRENT_VERSION);

        SliderSetFile {
            path: path.into(),
            version: CURRENT_VERSION,
            root,
            sets_in_file: BTreeSet::new(),
            sets_order: Vec::new(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SliderSetError> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

        let mut root = Element::parse(content)?;
        if root.name != schema::SLIDER_SET_INFO {
            return Err(SliderSetError::MissingRoot);
        }

        let version = u32::try_from(int_attr(&root, "version", 0)).unwrap_or(0);
        schema::upgrade_legacy_names(&mut root, version);

        let mut sets_in_file = BTreeSet::new();
        let mut sets_order = Vec::new();
        for set in child_elements(&root, schema::SLIDER_SET) {
            match attr(set, "name") {
                Some(name) => {
                    sets_in_file.insert(name.to_owned());
                    sets_order.push(name.to_owned());
                }
                None => log::warn!("Skipping unnamed slider set in {}", path.display()),
            }
        }

        Ok(SliderSetFile {
            path,
            version,
            root,
            sets_in_file,
            sets_order,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version the document was read with, or the current one once saved.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn has_set(&self, name: &str) -> bool {
        self.sets_in_file.contains(name)
    }

    // The last element with a given name is the one a set name refers to.
    fn set_element(&self, name: &str) -> Option<&Element> {
        self.root.children.iter().rev().find_map(|node| match node {
            XMLNode::Element(e) if e.name == schema::SLIDER_SET && attr(e, "name") == Some(name) => Some(e),
            _ => None,
        })
    }

    fn set_element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.root.children.iter_mut().rev().find_map(|node| match node {
            XMLNode::Element(e) if e.name == schema::SLIDER_SET && attr(e, "name") == Some(name) => Some(e),
            _ => None,
        })
    }

    pub fn get_set(&self, name: &str) -> Result<SliderSet, SliderSetError> {
        let element = self
            .set_element(name)
            .ok_or_else(|| SliderSetError::SetNotFound(name.to_owned()))?;
        SliderSet::from_element(element)
    }

    /// Every set in the document, in name order.
    pub fn get_all_sets(&self) -> Result<Vec<SliderSet>, SliderSetError> {
        self.sets_in_file.iter().map(|name| self.get_set(name)).collect()
    }

    pub fn set_names(&self) -> Vec<String> {
        self.sets_in_file.iter().cloned().collect()
    }

    /// Set names in the order they appear in the document. Repeated names are
    /// listed once, at their first position.
    pub fn set_names_unsorted(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sets_order
            .iter()
            .filter(|name| self.sets_in_file.contains(*name) && seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn set_shapes(&self, name: &str) -> Vec<String> {
        self.set_element(name)
            .map(|set| child_elements(set, schema::SHAPE).map(text).collect())
            .unwrap_or_default()
    }

    pub fn set_output_file_path(&self, name: &str) -> Option<PathBuf> {
        let set = self.set_element(name)?;
        let output_path = set
            .get_child(schema::OUTPUT_PATH)
            .map(|e| to_os_slashes(&text(e)))
            .unwrap_or_default();

        let mut path = PathBuf::from(output_path);
        if let Some(output_file) = set.get_child(schema::OUTPUT_FILE) {
            path.push(text(output_file));
        }
        Some(path)
    }

    /// Writes `set` into the document, replacing the element of the same
    /// name or appending a new one.
    pub fn update_set(&mut self, set: &SliderSet) {
        if let Some(element) = self.set_element_mut(&set.name) {
            set.write_slider_set(element);
            return;
        }

        self.root
            .children
            .push(XMLNode::Element(set.to_element()));
        self.sets_in_file.insert(set.name.clone());
        self.sets_order.push(set.name.clone());
    }

    pub fn delete_set(&mut self, name: &str) -> Result<(), SliderSetError> {
        if !self.sets_in_file.remove(name) {
            return Err(SliderSetError::SetNotFound(name.to_owned()));
        }
        self.sets_order.retain(|n| n != name);

        self.root.children.retain(|node| match node {
            XMLNode::Element(e) => !(e.name == schema::SLIDER_SET && attr(e, "name") == Some(name)),
            _ => true,
        });
        Ok(())
    }

    /// Writes the document back to its path, always with a byte-order mark
    /// and an XML declaration, in the current schema version.
    pub fn save(&mut self) -> Result<(), SliderSetError> {
        set_attr(&mut self.root, "version", CURRENT_VERSION);

        let config = EmitterConfig::new()
            .perform_indent(true)
            .indent_string("\t")
            .write_document_declaration(true);

        let mut buffer = UTF8_BOM.to_vec();
        self.root.write_with_config(&mut buffer, config)?;
        fs::write(&self.path, buffer)?;

        self.version = CURRENT_VERSION;
        Ok(())
    }
}
