use {
    crate::{parser::Position, VarType},
    std::{
        backtrace::Backtrace,
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
        io::Error as IoError,
    },
};

/// An error that aborts processing of a product configuration.
///
/// Warnings are not represented here; they go through [log::warn!] and
/// processing continues. Anything that becomes a `ConfigError` unwinds to
/// the caller.
#[derive(Debug)]
pub struct ConfigError {
    /// The kind of error that occurred.
    pub kind: ConfigErrorKind,

    /// The location of the error, when one is derivable.
    pub position: Option<Position>,

    /// Additional backtrace information.
    pub backtrace: Backtrace,
}

impl ConfigError {
    /// Create a new [ConfigError] with the given kind. The backtrace will be captured automatically.
    pub fn new(kind: ConfigErrorKind, position: Option<Position>) -> Self {
        Self {
            kind,
            position,
            backtrace: Backtrace::capture(),
        }
    }

    /// Create a new [ConfigError] for a CSV syntax error.
    pub fn csv(message: impl ToString, position: Position) -> Self {
        Self::new(ConfigErrorKind::Csv(message.to_string()), Some(position))
    }

    /// Create a new [ConfigError] for structurally invalid dump contents.
    pub fn dump_format(message: impl ToString, position: Position) -> Self {
        Self::new(ConfigErrorKind::DumpFormat(message.to_string()), Some(position))
    }

    /// Create a new [ConfigError] for a dump written by a version of dumpconfig we do not understand.
    pub fn unsupported_version(version: u32, position: Position) -> Self {
        Self::new(ConfigErrorKind::UnsupportedVersion(version), Some(position))
    }

    /// Create a new [ConfigError] for a config file named by an inherit statement that does not exist.
    pub fn missing_config_file(filename: impl ToString, position: Position) -> Self {
        Self::new(ConfigErrorKind::MissingConfigFile(filename.to_string()), Some(position))
    }

    /// Create a new [ConfigError] for a config file that reappeared in its own ancestor stack.
    pub fn infinite_recursion(filename: impl ToString, position: Position) -> Self {
        Self::new(ConfigErrorKind::InfiniteRecursion(filename.to_string()), Some(position))
    }

    /// Create a new [ConfigError] for a phase with no root nodes to flatten from.
    pub fn no_root_nodes() -> Self {
        Self::new(ConfigErrorKind::NoRootNodes, None)
    }

    /// Create a new [ConfigError] for an internal type-consistency fault.
    pub fn mismatched_type(
        name: impl ToString,
        var_type: VarType,
        detail: impl ToString,
        position: Position,
    ) -> Self {
        Self::new(
            ConfigErrorKind::MismatchedType {
                name: name.to_string(),
                var_type,
                detail: detail.to_string(),
            },
            Some(position),
        )
    }

    /// Create a new [ConfigError] for a failed kati invocation.
    pub fn kati(message: impl ToString) -> Self {
        Self::new(ConfigErrorKind::Kati(message.to_string()), None)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if let Some(position) = &self.position {
            write!(f, "{position}: ")?;
        }
        Display::fmt(&self.kind, f)
    }
}

impl From<IoError> for ConfigError {
    fn from(e: IoError) -> Self {
        Self::new(ConfigErrorKind::Io(e), None)
    }
}

impl Error for ConfigError {}

/// The types of errors that can occur while processing a product configuration.
#[derive(Debug)]
pub enum ConfigErrorKind {
    /// CSV syntax error in the dump.
    Csv(String),

    /// The dump's rows do not form a valid configuration.
    DumpFormat(String),

    /// The dump was written by a dumpconfig version we do not understand.
    UnsupportedVersion(u32),

    /// I/O error.
    Io(IoError),

    /// A config file named by an inherit statement is not part of the configuration.
    MissingConfigFile(String),

    /// A config file reappeared in its own ancestor stack.
    InfiniteRecursion(String),

    /// The phase declared no root nodes to flatten from.
    NoRootNodes,

    /// A variable's observed shape conflicts with its declared type.
    ///
    /// This signals a bug in whatever produced the configuration, not bad
    /// user input, and is deliberately kept apart from the validation kinds.
    MismatchedType {
        /// The variable.
        name: String,

        /// The type the variable was declared with.
        var_type: VarType,

        /// What was found instead.
        detail: String,
    },

    /// The kati subprocess failed.
    Kati(String),
}

impl Display for ConfigErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Csv(e) => write!(f, "CSV syntax error: {e}"),
            Self::DumpFormat(e) => write!(f, "Malformed dump: {e}"),
            Self::UnsupportedVersion(v) => write!(f, "Unsupported dumpconfig version: {v}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MissingConfigFile(filename) => write!(f, "Unable to find config file: {filename}"),
            Self::InfiniteRecursion(filename) => write!(f, "Infinite recursion loading {filename}"),
            Self::NoRootNodes => f.write_str("No root nodes in product configuration"),
            Self::MismatchedType {
                name,
                var_type,
                detail,
            } => {
                write!(f, "Internal error: variable {name} is declared {var_type} but {detail}")
            }
            Self::Kati(e) => write!(f, "kati failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConfigErrorKind};
    use crate::parser::Position;

    #[test]
    fn display_includes_position() {
        let e = ConfigError::missing_config_file("ghost.mk", Position::new("root.mk", Some(7)));
        assert_eq!(e.to_string(), "root.mk:7: Unable to find config file: ghost.mk");
    }

    #[test]
    fn display_without_position() {
        let e = ConfigError::no_root_nodes();
        assert_eq!(e.to_string(), "No root nodes in product configuration");
        assert!(matches!(e.kind, ConfigErrorKind::NoRootNodes));
    }
}
