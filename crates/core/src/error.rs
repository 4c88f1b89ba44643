//! Error types for embedded asset extraction.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting or normalizing embedded assets.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input is not a valid ZIP container, or an entry could not be read.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// Malformed XML in a container part.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// A part the container must have is missing.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// The workbook structure could not be understood.
    #[error("Workbook error: {0}")]
    WorkbookError(String),

    /// Invalid caller input (file names, paths).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::XmlError(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlError(format!("attribute: {}", e))
    }
}
