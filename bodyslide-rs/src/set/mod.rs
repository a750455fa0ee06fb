use std::{
    collections::BTreeMap,
    ops::Index,
    path::{Path, PathBuf},
};

use xmltree::{Element, XMLNode};

use crate::{
    diff::DiffDataSets,
    path::{join_list, split_list, to_backslashes, to_os_slashes},
    schema::{self, attr, bool_attr, child_elements, float_attr, set_attr, text, text_element},
    slider::{DiffInfo, SliderData},
    SliderSetError,
};

pub mod resolve;

use resolve::DiffBatch;

/// Numeric form of a failed clone, for callers that store slider indices.
pub const INVALID_SLIDER_INDEX: usize = 0xFFFF_FFFF;

pub const DEFAULT_SMOOTH_ANGLE: f32 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SliderSetShape {
    pub data_folders: Vec<String>,
    pub target_shape: Option<String>,
    pub smooth_seam_normals: bool,
    pub smooth_seam_normals_angle: f32,
    pub lock_normals: bool,
}

impl Default for SliderSetShape {
    fn default() -> Self {
        SliderSetShape {
            data_folders: Vec::new(),
            target_shape: None,
            smooth_seam_normals: true,
            smooth_seam_normals_angle: DEFAULT_SMOOTH_ANGLE,
            lock_normals: false,
        }
    }
}

impl SliderSetShape {
    /// The target name diffs of this shape are stored under.
    pub fn effective_target<'a>(&'a self, key: &'a str) -> &'a str {
        self.target_shape
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(key)
    }

    fn write_element(&self, key: &str) -> Element {
        let mut element = text_element(schema::SHAPE, key);

        if let Some(target) = self.target_shape.as_deref().filter(|t| !t.is_empty()) {
            set_attr(&mut element, "target", target);
        }

        if !self.data_folders.is_empty() {
            set_attr(
                &mut element,
                "DataFolder",
                to_backslashes(&join_list(&self.data_folders)),
            );
        }

        if !self.smooth_seam_normals {
            set_attr(&mut element, "SmoothSeamNormals", false);
        }

        if self.smooth_seam_normals && self.smooth_seam_normals_angle != DEFAULT_SMOOTH_ANGLE {
            set_attr(
                &mut element,
                "SmoothSeamNormalsAngle",
                self.smooth_seam_normals_angle,
            );
        }

        if self.lock_normals {
            set_attr(&mut element, "LockNormals", true);
        }

        element
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderSet {
    pub name: String,
    pub data_folder: String,
    pub input_file: String,
    pub output_path: String,
    pub output_file: String,
    pub gen_weights: bool,
    pub prevent_morph_file: bool,

    // Root that every data folder is relative to. Supplied by the caller,
    // never read from or written to a file.
    pub base_data_path: PathBuf,

    pub shape_attributes: BTreeMap<String, SliderSetShape>,
    pub sliders: Vec<SliderData>,

    // Default normals generation layers, kept as loaded.
    pub def_normal_gen: Vec<Element>,
}

impl Default for SliderSet {
    fn default() -> Self {
        SliderSet {
            name: String::new(),
            data_folder: String::new(),
            input_file: String::new(),
            output_path: String::new(),
            output_file: String::new(),
            gen_weights: true,
            prevent_morph_file: false,
            base_data_path: PathBuf::new(),
            shape_attributes: BTreeMap::new(),
            sliders: Vec::new(),
            def_normal_gen: Vec::new(),
        }
    }
}

impl Index<usize> for SliderSet {
    type Output = SliderData;

    fn index(&self, index: usize) -> &SliderData {
        &self.sliders[index]
    }
}

impl SliderSet {
    pub fn new(name: &str) -> Self {
        SliderSet {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn from_element(element: &Element) -> Result<Self, SliderSetError> {
        let mut set = SliderSet::default();
        set.load_slider_set(element)?;
        Ok(set)
    }

    /// Reads a `SliderSet` element into this set. Loading on top of an
    /// existing set accumulates: shapes are updated in place and sliders
    /// that already exist take on the incoming data entries.
    pub fn load_slider_set(&mut self, element: &Element) -> Result<(), SliderSetError> {
        self.name = attr(element, "name")
            .ok_or(SliderSetError::MissingAttribute {
                element: schema::SLIDER_SET,
                attribute: "name",
            })?
            .to_owned();

        if let Some(folder) = element.get_child(schema::DATA_FOLDER) {
            self.data_folder = to_os_slashes(&text(folder));
        }

        if let Some(source) = element.get_child(schema::SOURCE_FILE) {
            self.input_file = text(source);
        }

        if let Some(output_path) = element.get_child(schema::OUTPUT_PATH) {
            self.output_path = to_os_slashes(&text(output_path));
        }

        self.gen_weights = true;
        self.prevent_morph_file = false;

        if let Some(output_file) = element.get_child(schema::OUTPUT_FILE) {
            self.output_file = text(output_file);
            self.gen_weights = bool_attr(output_file, "GenWeights", true);
            self.prevent_morph_file = bool_attr(output_file, "PreventMorphFile", false);
        }

        for shape_element in child_elements(element, schema::SHAPE) {
            let key = text(shape_element);
            if key.is_empty() {
                continue;
            }

            let shape = self.shape_attributes.entry(key).or_default();
            if let Some(folders) = attr(shape_element, "DataFolder") {
                shape.data_folders = split_list(&to_os_slashes(folders));
            } else if shape.data_folders.is_empty() {
                shape.data_folders.push(self.data_folder.clone());
            }

            if let Some(target) = attr(shape_element, "target").filter(|t| !t.is_empty()) {
                shape.target_shape = Some(target.to_owned());
            }

            shape.smooth_seam_normals = bool_attr(shape_element, "SmoothSeamNormals", true);
            shape.smooth_seam_normals_angle =
                float_attr(shape_element, "SmoothSeamNormalsAngle", DEFAULT_SMOOTH_ANGLE);
            shape.lock_normals = bool_attr(shape_element, "LockNormals", false);
        }

        for slider_element in child_elements(element, schema::SLIDER) {
            let slider = match SliderData::from_element(slider_element, self.gen_weights) {
                Ok(slider) => slider,
                Err(err) => {
                    log::warn!("Skipping slider in set '{}': {}", self.name, err);
                    continue;
                }
            };

            match self.slider_mut(&slider.name) {
                Some(existing) => {
                    for df in &slider.data_files {
                        existing.add_data_file(&df.target_name, &df.data_name, &df.file_name, df.local);
                    }
                }
                None => self.sliders.push(slider),
            }
        }

        match element.get_child(schema::NORMALS_GENERATION) {
            Some(normals) => {
                if self.def_normal_gen.is_empty() {
                    self.def_normal_gen = normals
                        .children
                        .iter()
                        .filter_map(XMLNode::as_element)
                        .cloned()
                        .collect();
                }
            }
            None => self.def_normal_gen.clear(),
        }

        Ok(())
    }

    /// Replaces the contents of `element` with this set. Sliders without any
    /// data entries are left out.
    pub fn write_slider_set(&self, element: &mut Element) {
        element.children.clear();
        set_attr(element, "name", &self.name);

        let mut push = |child: Element| element.children.push(XMLNode::Element(child));

        push(text_element(schema::DATA_FOLDER, &to_backslashes(&self.data_folder)));
        push(text_element(schema::SOURCE_FILE, &self.input_file));
        push(text_element(schema::OUTPUT_PATH, &to_backslashes(&self.output_path)));

        let mut output_file = text_element(schema::OUTPUT_FILE, &self.output_file);
        set_attr(&mut output_file, "GenWeights", self.gen_weights);
        set_attr(&mut output_file, "PreventMorphFile", self.prevent_morph_file);
        push(output_file);

        for (key, shape) in &self.shape_attributes {
            push(shape.write_element(key));
        }

        for slider in self.sliders.iter().filter(|s| !s.data_files.is_empty()) {
            push(slider.write_element(self.gen_weights));
        }

        if !self.def_normal_gen.is_empty() {
            let mut normals = Element::new(schema::NORMALS_GENERATION);
            normals.children = self
                .def_normal_gen
                .iter()
                .cloned()
                .map(XMLNode::Element)
                .collect();
            push(normals);
        }
    }

    pub fn to_element(&self) -> Element {
        let mut element = Element::new(schema::SLIDER_SET);
        self.write_slider_set(&mut element);
        element
    }

    pub fn len(&self) -> usize {
        self.sliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sliders.is_empty()
    }

    pub fn slider_index(&self, name: &str) -> Option<usize> {
        self.sliders.iter().position(|s| s.name == name)
    }

    pub fn slider_exists(&self, name: &str) -> bool {
        self.slider_index(name).is_some()
    }

    pub fn slider(&self, name: &str) -> Option<&SliderData> {
        self.sliders.iter().find(|s| s.name == name)
    }

    pub fn slider_mut(&mut self, name: &str) -> Option<&mut SliderData> {
        self.sliders.iter_mut().find(|s| s.name == name)
    }

    /// Appends a copy of `name` called `new_name`, with its value reset and
    /// no zap toggles. Returns `None` if `name` is missing or `new_name` is
    /// already taken.
    pub fn clone_slider(&mut self, name: &str, new_name: &str) -> Option<usize> {
        if self.slider_exists(new_name) {
            return None;
        }

        let mut clone = self.slider(name)?.clone();
        clone.name = new_name.to_owned();
        clone.cur_value = 0.0;
        clone.show = true;
        clone.zap_toggles.clear();

        self.sliders.push(clone);
        Some(self.sliders.len() - 1)
    }

    /// Removes a slider and every zap toggle that points at it.
    pub fn delete_slider(&mut self, name: &str) {
        for slider in self.sliders.iter_mut() {
            slider.zap_toggles.retain(|toggle| toggle != name);
        }

        if let Some(index) = self.slider_index(name) {
            self.sliders.remove(index);
        }
    }

    /// Appends an empty slider, or returns the index of the one already
    /// carrying that name.
    pub fn create_slider(&mut self, name: &str) -> usize {
        if let Some(index) = self.slider_index(name) {
            return index;
        }

        self.sliders.push(SliderData::new(name));
        self.sliders.len() - 1
    }

    /// Appends a slider with the flags, defaults, toggles and data entries of
    /// `other`. Runtime state starts fresh.
    pub fn copy_slider(&mut self, other: &SliderData) -> usize {
        if let Some(index) = self.slider_index(&other.name) {
            return index;
        }

        let mut slider = SliderData::new(&other.name);
        slider.flags = other.flags;
        slider.def_big_value = other.def_big_value;
        slider.def_small_value = other.def_small_value;
        slider.zap_toggles = other.zap_toggles.clone();
        slider.data_files = other.data_files.clone();

        self.sliders.push(slider);
        self.sliders.len() - 1
    }

    /// Flips the recorded defaults of every slider the zap toggles, as done
    /// when a zap is moved away from its own default before a build.
    pub fn toggle_zap_defaults(&mut self, zap_name: &str) {
        let Some(toggles) = self.slider(zap_name).map(|zap| zap.zap_toggles.clone()) else {
            return;
        };

        for toggle in &toggles {
            if let Some(slider) = self.slider_mut(toggle) {
                slider.def_big_value = 100.0 - slider.def_big_value;
                slider.def_small_value = 100.0 - slider.def_small_value;
            }
        }
    }

    pub fn shapes(&self) -> impl Iterator<Item = (&str, &SliderSetShape)> {
        self.shape_attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Finds the shape whose effective target is `target`.
    pub fn target_to_shape(&self, target: &str) -> Option<&str> {
        self.shape_attributes
            .iter()
            .find(|(key, shape)| shape.effective_target(key) == target)
            .map(|(key, _)| key.as_str())
    }

    pub fn shape_to_target(&self, shape: &str) -> Option<&str> {
        self.shape_attributes
            .get_key_value(shape)
            .map(|(key, s)| s.effective_target(key))
    }

    pub fn shape_data_folders(&self, shape: &str) -> &[String] {
        self.shape_attributes
            .get(shape)
            .map(|s| s.data_folders.as_slice())
            .unwrap_or_default()
    }

    /// An empty `target` clears the alias.
    pub fn set_shape_target(&mut self, shape: &str, target: &str) {
        self.shape_attributes.entry(shape.to_owned()).or_default().target_shape =
            Some(target.to_owned()).filter(|t| !t.is_empty());
    }

    pub fn set_shape_data_folders(&mut self, shape: &str, folders: Vec<String>) {
        self.shape_attributes.entry(shape.to_owned()).or_default().data_folders = folders;
    }

    pub fn set_base_data_path(&mut self, path: impl Into<PathBuf>) {
        self.base_data_path = path.into();
    }

    pub fn input_file_name(&self) -> PathBuf {
        self.base_data_path.join(&self.data_folder).join(&self.input_file)
    }

    pub fn output_file_path(&self) -> PathBuf {
        Path::new(&self.output_path).join(&self.output_file)
    }

    pub fn gen_weights(&self) -> bool {
        self.gen_weights
    }

    pub fn prevent_morph_file(&self) -> bool {
        self.prevent_morph_file
    }

    pub fn normals_gen_layers(&self) -> &[Element] {
        &self.def_normal_gen
    }

    /// Loads the diff data of every slider into `store`, optionally limited
    /// to the entries of one shape. An empty filter loads every shape.
    pub fn load_set_diff_data(&self, store: &mut DiffDataSets, for_shape: Option<&str>) {
        let mut batch = DiffBatch::default();

        for slider in &self.sliders {
            for diff in &slider.data_files {
                if diff.file_name.len() <= 4 {
                    continue;
                }

                let Some(shape) = self.target_to_shape(&diff.target_name) else {
                    log::debug!(
                        "No shape for target '{}' of slider '{}'",
                        diff.target_name,
                        slider.name
                    );
                    continue;
                };

                if for_shape.is_some_and(|filter| !filter.is_empty() && filter != shape) {
                    continue;
                }

                match self.locate_diff(shape, diff) {
                    Some(location) => batch.load(store, diff, location),
                    None => log::debug!("Unresolvable data file '{}'", diff.file_name),
                }
            }
        }

        batch.finish(store);
    }

    /// Folds `merge_set` into this set. Data entries this set doesn't have
    /// yet are added with their locality forced to `new_data_local`, and their
    /// diffs are loaded from `merge_set`'s folders into `store`, or into
    /// `base_store` for entries of `base_shape`.
    pub fn merge(
        &mut self,
        merge_set: &SliderSet,
        store: &mut DiffDataSets,
        base_store: &mut DiffDataSets,
        base_shape: &str,
        new_data_local: bool,
    ) {
        let mut added: Vec<&DiffInfo> = Vec::new();

        for incoming in &merge_set.sliders {
            match self.slider_index(&incoming.name) {
                Some(index) => {
                    for sd in &incoming.data_files {
                        let present = self.sliders[index].data_files.iter().any(|rd| {
                            rd.target_name == sd.target_name
                                && rd.data_name == sd.data_name
                                && self.target_to_shape(&rd.target_name)
                                    == merge_set.target_to_shape(&sd.target_name)
                        });

                        if !present {
                            self.sliders[index].add_data_file(
                                &sd.target_name,
                                &sd.data_name,
                                &sd.file_name,
                                new_data_local,
                            );
                            added.push(sd);
                        }
                    }
                }
                None => {
                    let mut slider = incoming.clone();
                    for df in slider.data_files.iter_mut() {
                        df.local = new_data_local;
                    }
                    self.sliders.push(slider);
                    added.extend(incoming.data_files.iter());
                }
            }
        }

        let mut batch = DiffBatch::default();
        let mut base_batch = DiffBatch::default();

        // Resolution uses the entry as it was in the merged set, before its
        // locality was rewritten.
        for diff in added {
            if diff.file_name.len() <= 4 {
                continue;
            }

            let Some(shape) = merge_set.target_to_shape(&diff.target_name) else {
                log::debug!("No shape for merged target '{}'", diff.target_name);
                continue;
            };

            let Some(location) = merge_set.locate_diff(shape, diff) else {
                continue;
            };

            if shape == base_shape {
                base_batch.load(base_store, diff, location);
            } else {
                batch.load(store, diff, location);
            }
        }

        for (key, shape) in &merge_set.shape_attributes {
            let mut shape = shape.clone();
            if new_data_local {
                shape.data_folders.clear();
            }
            self.shape_attributes.insert(key.clone(), shape);
        }

        batch.finish(store);
        base_batch.finish(base_store);
    }
}
