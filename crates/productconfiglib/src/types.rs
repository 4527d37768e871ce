use {
    crate::parser::Str,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// Classification of how a named product variable accumulates values across
/// the inheritance graph.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum VarType {
    /// Space-joined token list; assignments append to or rebuild the list.
    List,

    /// Exactly one value, immutable after its first assignment.
    Single,

    /// Opaque string with last-write-wins semantics.
    #[default]
    Unknown,
}

impl VarType {
    /// Parse a type name as it appears in dump `var` rows.
    pub fn from_dump(name: &str) -> Option<Self> {
        match name {
            "list" => Some(Self::List),
            "single" => Some(Self::Single),
            _ => None,
        }
    }
}

impl Display for VarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::List => f.write_str("list"),
            Self::Single => f.write_str("single"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// A resolved variable value in a flattened configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// An ordered token list.
    List(Vec<Str>),

    /// A single value, set once.
    Single(Str),

    /// An opaque scalar.
    Unknown(Str),
}

impl Value {
    /// The variable type this value was resolved under.
    pub fn var_type(&self) -> VarType {
        match self {
            Self::List(_) => VarType::List,
            Self::Single(_) => VarType::Single,
            Self::Unknown(_) => VarType::Unknown,
        }
    }

    /// The empty default for a variable of type `var_type`.
    pub fn empty(var_type: VarType) -> Self {
        match var_type {
            VarType::List => Self::List(Vec::new()),
            VarType::Single => Self::Single(Str::default()),
            VarType::Unknown => Self::Unknown(Str::default()),
        }
    }

    /// The token list, if this is a list value.
    pub fn as_list(&self) -> Option<&[Str]> {
        match self {
            Self::List(words) => Some(words),
            _ => None,
        }
    }

    /// The scalar text, if this is a single or unknown value.
    pub fn as_scalar(&self) -> Option<&Str> {
        match self {
            Self::List(_) => None,
            Self::Single(value) | Self::Unknown(value) => Some(value),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::List(words) => {
                for (index, word) in words.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(word.as_str())?;
                }
                Ok(())
            }
            Self::Single(value) | Self::Unknown(value) => f.write_str(value.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Value, VarType};

    #[test]
    fn var_type_from_dump() {
        assert_eq!(VarType::from_dump("list"), Some(VarType::List));
        assert_eq!(VarType::from_dump("single"), Some(VarType::Single));
        assert_eq!(VarType::from_dump("widget"), None);
    }

    #[test]
    fn empty_defaults() {
        assert_eq!(Value::empty(VarType::List), Value::List(Vec::new()));
        assert_eq!(Value::empty(VarType::Single).to_string(), "");
        assert_eq!(Value::empty(VarType::Unknown).var_type(), VarType::Unknown);
    }

    #[test]
    fn list_display_is_space_joined() {
        let value = Value::List(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(value.to_string(), "a b c");
    }
}
