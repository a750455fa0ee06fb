//! Element names, schema versions and the attribute readers shared by the
//! slider-set loaders.

use xmltree::{Element, XMLNode};

pub const CURRENT_VERSION: u32 = 1;

pub const SLIDER_SET_INFO: &str = "SliderSetInfo";
pub const SLIDER_SET: &str = "SliderSet";
pub const DATA_FOLDER: &str = "DataFolder";
pub const SOURCE_FILE: &str = "SourceFile";
pub const OUTPUT_PATH: &str = "OutputPath";
pub const OUTPUT_FILE: &str = "OutputFile";
pub const SHAPE: &str = "Shape";
pub const SLIDER: &str = "Slider";
pub const DATA: &str = "Data";
pub const NORMALS_GENERATION: &str = "NormalsGeneration";

// Version 0 files used these before the rename to `DataFolder` and `Shape`.
pub const LEGACY_DATA_FOLDER: &str = "SetFolder";
pub const LEGACY_SHAPE: &str = "BaseShapeName";

/// Rewrites every legacy-named element below `root` to its current name, so
/// the rest of the crate only ever sees one schema.
pub fn upgrade_legacy_names(root: &mut Element, version: u32) {
    for set in child_elements_mut(root, SLIDER_SET) {
        upgrade_set_element(set, version);
    }
}

pub fn upgrade_set_element(set: &mut Element, version: u32) {
    if version >= CURRENT_VERSION {
        return;
    }

    for child in set.children.iter_mut() {
        if let XMLNode::Element(element) = child {
            if element.name == LEGACY_DATA_FOLDER {
                element.name = DATA_FOLDER.to_owned();
            } else if element.name == LEGACY_SHAPE {
                element.name = SHAPE.to_owned();
            }
        }
    }
}

pub fn child_elements<'a>(
    element: &'a Element,
    name: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    element.children.iter().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

pub fn child_elements_mut<'a>(
    element: &'a mut Element,
    name: &'a str,
) -> impl Iterator<Item = &'a mut Element> + 'a {
    element.children.iter_mut().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

pub fn attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element.attributes.get(name).map(String::as_str)
}

/// Reads a boolean the way the files have always been read: integers are
/// true when non-zero, otherwise `true`/`false` in any common casing.
pub fn bool_attr(element: &Element, name: &str, default: bool) -> bool {
    attr(element, name).and_then(parse_bool).unwrap_or(default)
}

pub fn parse_bool(value: &str) -> Option<bool> {
    if let Ok(number) = value.parse::<i64>() {
        return Some(number != 0);
    }

    match value {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub fn float_attr(element: &Element, name: &str, default: f32) -> f32 {
    attr(element, name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

pub fn int_attr(element: &Element, name: &str, default: i64) -> i64 {
    attr(element, name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

pub fn text(element: &Element) -> String {
    element
        .get_text()
        .map(|text| text.into_owned())
        .unwrap_or_default()
}

pub fn set_attr(element: &mut Element, name: &str, value: impl ToString) {
    element.attributes.insert(name.to_owned(), value.to_string());
}

pub fn text_element(name: &str, text: &str) -> Element {
    let mut element = Element::new(name);
    if !text.is_empty() {
        element.children.push(XMLNode::Text(text.to_owned()));
    }
    element
}
