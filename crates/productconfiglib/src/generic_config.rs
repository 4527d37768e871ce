use {
    crate::{parser::Str, VarType},
    std::collections::BTreeMap,
};

/// A product config file normalized to its textual effect: an ordered list
/// of assignments and inherit calls.
#[derive(Clone, Debug)]
pub struct ConfigFile {
    /// The filename, unique within a [GenericConfig].
    pub filename: String,

    /// Statements in original textual order.
    pub statements: Vec<Statement>,
}

impl ConfigFile {
    /// Iterate the inherit statements of this file in textual order.
    pub fn inherits(&self) -> impl Iterator<Item = &Inherit> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Inherit(inherit) => Some(inherit),
            Statement::Assign(_) => None,
        })
    }
}

/// A single normalized statement.
#[derive(Clone, Debug)]
pub enum Statement {
    /// Assignment of a variable.
    Assign(Assign),

    /// An inherit-product call.
    Inherit(Inherit),
}

/// Assignment of a variable to a value.
///
/// The value holds the literal text chunks of the right-hand side, split
/// around references to the variable's own prior value: `VAR := a $(VAR) b`
/// is stored as `["a ", " b"]`, with one implicit prior-value reference
/// between each pair of consecutive chunks. A plain assignment is a single
/// chunk with no references.
#[derive(Clone, Debug)]
pub struct Assign {
    /// The variable name.
    pub name: String,

    /// The literal chunks of the right-hand side.
    pub value: Vec<Str>,
}

/// An inherit-product call naming another config file.
#[derive(Clone, Debug)]
pub struct Inherit {
    /// The inherited file.
    pub filename: Str,
}

/// The normalized statement-list form of one evaluation phase.
#[derive(Clone, Debug, Default)]
pub struct GenericConfig {
    /// The phase name, e.g. `PRODUCTS`.
    pub phase: String,

    /// The files flattening may start from.
    pub root_nodes: Vec<String>,

    /// Declared product variables, shared by all files.
    pub product_vars: BTreeMap<String, VarType>,

    /// The config files, keyed by filename.
    pub files: BTreeMap<String, ConfigFile>,
}

impl GenericConfig {
    /// The declared type of `name`, or [VarType::Unknown] if undeclared.
    #[inline(always)]
    pub fn var_type(&self, name: &str) -> VarType {
        self.product_vars.get(name).copied().unwrap_or_default()
    }
}
