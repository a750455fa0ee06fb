use modular_bitfield::bitfield;
use xmltree::Element;

use crate::{
    path::{last_separator, split_list, to_backslashes, to_os_slashes},
    schema::{self, attr, bool_attr, child_elements, float_attr, set_attr, text},
    SliderSetError,
};

/// One reference from a slider to a named diff inside a data file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffInfo {
    pub target_name: String,
    pub data_name: String,
    pub file_name: String,
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffFormat {
    Bsd,
    // OSD entries name the file plus a record inside it.
    Osd { file: String, record: String },
}

impl DiffInfo {
    pub fn new(target_name: &str, data_name: &str, file_name: &str, local: bool) -> Self {
        DiffInfo {
            target_name: target_name.to_owned(),
            data_name: data_name.to_owned(),
            file_name: file_name.to_owned(),
            local,
        }
    }

    /// Works out how the entry's data is stored. Entries too short to carry
    /// an extension, and OSD entries without a record name, can't be loaded.
    pub fn format(&self) -> Option<DiffFormat> {
        if self.file_name.len() <= 4 {
            return None;
        }

        if self.file_name.ends_with(".bsd") {
            return Some(DiffFormat::Bsd);
        }

        let split = last_separator(&self.file_name)?;
        Some(DiffFormat::Osd {
            file: self.file_name[..split].to_owned(),
            record: self.file_name[split + 1..].to_owned(),
        })
    }
}

#[bitfield(filled = false)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SliderFlags {
    pub clamp: bool,
    pub hidden: bool,
    pub invert: bool,
    pub zap: bool,
    pub uv: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SliderData {
    pub name: String,
    pub flags: SliderFlags,
    pub def_big_value: f32,
    pub def_small_value: f32,
    pub zap_toggles: Vec<String>,
    pub data_files: Vec<DiffInfo>,

    // Runtime state, never written out.
    pub cur_value: f32,
    pub show: bool,
}

impl Default for SliderData {
    fn default() -> Self {
        SliderData {
            name: String::new(),
            flags: SliderFlags::new(),
            def_big_value: 0.0,
            def_small_value: 0.0,
            zap_toggles: Vec::new(),
            data_files: Vec::new(),
            cur_value: 0.0,
            show: true,
        }
    }
}

impl SliderData {
    pub fn new(name: &str) -> Self {
        SliderData {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Parses a `Slider` element. Weighted sets carry separate `small` and
    /// `big` defaults, single-weight sets one `default`.
    pub fn from_element(element: &Element, gen_weights: bool) -> Result<Self, SliderSetError> {
        let name = attr(element, "name").ok_or(SliderSetError::MissingAttribute {
            element: schema::SLIDER,
            attribute: "name",
        })?;

        let mut slider = SliderData::new(name);
        slider.flags = SliderFlags::new()
            .with_invert(bool_attr(element, "invert", false))
            .with_hidden(bool_attr(element, "hidden", false))
            .with_clamp(bool_attr(element, "clamp", false))
            .with_zap(bool_attr(element, "zap", false))
            .with_uv(bool_attr(element, "uv", false));

        if gen_weights {
            slider.def_small_value = float_attr(element, "small", 0.0);
            slider.def_big_value = float_attr(element, "big", 0.0);
        } else {
            let big = float_attr(element, "big", 0.0);
            let value = float_attr(element, "default", big);
            slider.def_small_value = value;
            slider.def_big_value = value;
        }

        if slider.flags.zap() {
            if let Some(toggles) = attr(element, "zaptoggles") {
                slider.zap_toggles = split_list(toggles);
            }
        }

        for data in child_elements(element, schema::DATA) {
            match (attr(data, "name"), attr(data, "target")) {
                (Some(data_name), Some(target)) => {
                    let file_name = to_os_slashes(&text(data));
                    let local = bool_attr(data, "local", false);
                    slider.add_data_file(target, data_name, &file_name, local);
                }
                _ => log::warn!("Skipping incomplete data entry in slider '{}'", name),
            }
        }

        Ok(slider)
    }

    pub fn write_element(&self, gen_weights: bool) -> Element {
        let mut element = Element::new(schema::SLIDER);
        set_attr(&mut element, "name", &self.name);
        set_attr(&mut element, "invert", self.flags.invert());

        // Defaults are stored as whole percentages.
        if gen_weights {
            set_attr(&mut element, "small", self.def_small_value as i32);
            set_attr(&mut element, "big", self.def_big_value as i32);
        } else {
            set_attr(&mut element, "default", self.def_big_value as i32);
        }

        if self.flags.hidden() {
            set_attr(&mut element, "hidden", true);
        }
        if self.flags.clamp() {
            set_attr(&mut element, "clamp", true);
        }

        if self.flags.zap() {
            set_attr(&mut element, "zap", true);

            let toggles: String = self.zap_toggles.iter().map(|t| format!("{};", t)).collect();
            if !toggles.is_empty() {
                set_attr(&mut element, "zaptoggles", toggles);
            }
        }

        if self.flags.uv() {
            set_attr(&mut element, "uv", true);
        }

        for df in &self.data_files {
            let mut data = schema::text_element(schema::DATA, &to_backslashes(&df.file_name));
            set_attr(&mut data, "name", &df.data_name);
            set_attr(&mut data, "target", &df.target_name);
            if df.local {
                set_attr(&mut data, "local", true);
            }
            element.children.push(xmltree::XMLNode::Element(data));
        }

        element
    }

    pub fn add_data_file(&mut self, target: &str, data_name: &str, file_name: &str, local: bool) -> usize {
        self.data_files
            .push(DiffInfo::new(target, data_name, file_name, local));
        self.data_files.len() - 1
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.data_files.iter().any(|df| df.target_name == target)
    }

    pub fn target_data_name(&self, target: &str) -> Option<&str> {
        self.data_files
            .iter()
            .find(|df| df.target_name == target)
            .map(|df| df.data_name.as_str())
    }

    pub fn data_file_name(&self, target: &str) -> Option<&str> {
        self.data_files
            .iter()
            .find(|df| df.target_name == target)
            .map(|df| df.file_name.as_str())
    }

    pub fn set_local_data(&mut self, target: &str, local: bool) {
        if let Some(df) = self.data_files.iter_mut().find(|df| df.target_name == target) {
            df.local = local;
        }
    }

    pub fn rename_target(&mut self, old_target: &str, new_target: &str) {
        for df in self.data_files.iter_mut().filter(|df| df.target_name == old_target) {
            df.target_name = new_target.to_owned();
        }
    }

    pub fn remove_target(&mut self, target: &str) {
        self.data_files.retain(|df| df.target_name != target);
    }

    /// Default as a slider value for the requested weight.
    pub fn default_value(&self, big: bool) -> f32 {
        if big {
            self.def_big_value / 100.0
        } else {
            self.def_small_value / 100.0
        }
    }
}
