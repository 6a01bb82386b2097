//! Record loading, label templates and packaging for DYMO label generation.
//!
//! Everything here is plain file work: spreadsheets in, label files or a zip
//! archive out. Selection logic lives in `labelgen-selection`.

pub mod archive;
pub mod csv;
pub mod dataset;
pub mod error;
pub mod filename;
pub mod input;
pub mod join;
pub mod template;
pub mod xlsx;

pub use archive::{archive_name, generate_labels, package, write_labels, Label};
pub use dataset::{load, Dataset, Record, SourceOptions, Table};
pub use error::{DataError, DuplicateKey, ErrorKind};
pub use filename::{build_filename, sanitize, DEFAULT_PATTERN};
pub use input::{load_input, load_joined, InputSpec, LoadedInput};
pub use join::{join, JoinStats};
pub use template::{extract_placeholders, fill, read_template, validate, TemplateReport};
