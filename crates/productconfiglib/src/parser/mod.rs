//! Parsers for the kati dumpconfig CSV trace.

pub mod csv;

mod dump;
mod error;
mod position;

use {
    crate::make_config::MakeConfig,
    std::{fs::File, io::Read, path::Path},
};

pub use {
    dump::DumpConfigParser,
    error::{ConfigError, ConfigErrorKind},
    position::{cache_filename, Position, Str},
};

/// Parse a dumpconfig CSV file, returning one [MakeConfig] per evaluation
/// phase.
pub fn parse(filename: impl AsRef<Path>) -> Result<Vec<MakeConfig>, ConfigError> {
    let filename = filename.as_ref();
    let mut file = File::open(filename)?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    drop(file);
    parse_data(&filename.to_string_lossy(), &data)
}

/// Parse dumpconfig CSV contents. `filename` is used for diagnostics only.
pub fn parse_data(filename: &str, data: &str) -> Result<Vec<MakeConfig>, ConfigError> {
    DumpConfigParser::parse(filename, data)
}
