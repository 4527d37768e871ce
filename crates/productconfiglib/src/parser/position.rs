use {
    once_cell::sync::Lazy,
    std::{
        cmp::Ordering,
        collections::HashSet,
        fmt::{Display, Formatter, Result as FmtResult},
        hash::{Hash, Hasher},
        sync::{Arc, Mutex},
    },
};

/// Process-wide cache of filenames seen in dumps. A dump names the same few
/// hundred files in tens of thousands of `val` rows.
static FILENAMES: Lazy<Mutex<HashSet<Arc<str>>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Return a shared, deduplicated copy of `filename`.
pub fn cache_filename(filename: &str) -> Arc<str> {
    let mut cache = FILENAMES.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(cached) = cache.get(filename) {
        Arc::clone(cached)
    } else {
        let name: Arc<str> = Arc::from(filename);
        cache.insert(Arc::clone(&name));
        name
    }
}

/// Location of an item in a product configuration file.
///
/// The line is absent when the dump only knew the file; both parts are
/// absent for synthesized values. Positions order by file, then line, with
/// absent parts sorting first.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Position {
    /// The file, if known.
    pub file: Option<Arc<str>>,

    /// The 1-based line number, if known.
    pub line: Option<u32>,
}

impl Position {
    /// Create a position from a filename and an optional line number.
    pub fn new(file: &str, line: Option<u32>) -> Self {
        Self {
            file: Some(cache_filename(file)),
            line,
        }
    }

    /// Parse a `file:line` reference as it appears in dump `val` and
    /// `inherit` rows. A missing or unparseable line number leaves the whole
    /// text as the filename; an empty reference is an unknown position.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::default();
        }

        if let Some((file, line)) = s.rsplit_once(':') {
            if let Ok(line) = line.parse::<u32>() {
                return Self::new(file, Some(line));
            }
        }

        Self::new(s, None)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{file}:{line}"),
            (Some(file), None) => f.write_str(file),
            _ => f.write_str("<unknown>"),
        }
    }
}

/// A string annotated with the position it came from.
///
/// Equality, ordering and hashing consider only the text: two `Str`s read
/// from different positions are the same key in a map.
#[derive(Clone, Debug, Default)]
pub struct Str {
    /// The text.
    pub value: String,

    /// Where the text was defined.
    pub position: Position,
}

impl Str {
    /// Create a new [Str] at the given position.
    pub fn new(position: Position, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            position,
        }
    }

    /// Create a [Str] with no position information.
    pub fn anonymous(value: impl Into<String>) -> Self {
        Self::new(Position::default(), value)
    }

    /// The text as a string slice.
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Str {}

impl PartialOrd for Str {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Str {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for Str {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Display for Str {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.value)
    }
}

impl From<&str> for Str {
    fn from(value: &str) -> Self {
        Self::anonymous(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{cache_filename, Position, Str};

    #[test]
    fn cached_filenames_are_shared() {
        let a = cache_filename("device/generic/product.mk");
        let b = cache_filename("device/generic/product.mk");
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn position_parse() {
        let pos = Position::parse("device/generic/product.mk:42");
        assert_eq!(pos.file.as_deref(), Some("device/generic/product.mk"));
        assert_eq!(pos.line, Some(42));

        let pos = Position::parse("device/generic/product.mk");
        assert_eq!(pos.file.as_deref(), Some("device/generic/product.mk"));
        assert_eq!(pos.line, None);

        // An unparseable line number is kept as part of the filename.
        let pos = Position::parse("weird:name");
        assert_eq!(pos.file.as_deref(), Some("weird:name"));
        assert_eq!(pos.line, None);

        assert_eq!(Position::parse(""), Position::default());
    }

    #[test]
    fn position_ordering() {
        let unknown = Position::default();
        let file_only = Position::new("a.mk", None);
        let early = Position::new("a.mk", Some(1));
        let late = Position::new("a.mk", Some(9));
        let other_file = Position::new("b.mk", Some(1));

        assert!(unknown < file_only);
        assert!(file_only < early);
        assert!(early < late);
        assert!(late < other_file);
    }

    #[test]
    fn str_compares_by_value_only() {
        let a = Str::new(Position::new("a.mk", Some(1)), "same");
        let b = Str::new(Position::new("b.mk", Some(99)), "same");
        assert_eq!(a, b);

        let mut map = std::collections::HashMap::new();
        map.insert(a, 1);
        map.insert(b, 2);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::new("a.mk", Some(3)).to_string(), "a.mk:3");
        assert_eq!(Position::new("a.mk", None).to_string(), "a.mk");
        assert_eq!(Position::default().to_string(), "<unknown>");
    }
}
