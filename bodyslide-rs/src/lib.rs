use thiserror::Error;

pub mod compose;
pub mod data;
pub mod diff;
pub mod file;
mod math;
pub mod path;
pub mod schema;
pub mod set;
pub mod slider;

pub use compose::{apply_sliders, SliderValue};
pub use diff::{DiffDataError, DiffDataSets};
pub use file::SliderSetFile;
pub use set::{SliderSet, SliderSetShape, INVALID_SLIDER_INDEX};
pub use slider::{DiffInfo, SliderData, SliderFlags};

#[derive(Error, Debug)]
pub enum SliderSetError {
    #[error("could not access slider set file")]
    Io(#[from] std::io::Error),
    #[error("could not parse slider set document")]
    Parse(#[from] xmltree::ParseError),
    #[error("could not write slider set document")]
    Write(#[from] xmltree::Error),
    #[error("document has no SliderSetInfo root")]
    MissingRoot,
    #[error("{element} element is missing its {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("no slider set named '{0}'")]
    SetNotFound(String),
}

impl SliderSetError {
    /// Integer code as reported by the tools that consume slider-set files:
    /// the OS error for I/O, 100 for a missing root, 1 for an unknown set.
    pub fn code(&self) -> i32 {
        match self {
            SliderSetError::Io(err) => err.raw_os_error().unwrap_or(-1),
            SliderSetError::Parse(_) | SliderSetError::Write(_) => 2,
            SliderSetError::MissingRoot => 100,
            SliderSetError::MissingAttribute { .. } => 2,
            SliderSetError::SetNotFound(_) => 1,
        }
    }
}
