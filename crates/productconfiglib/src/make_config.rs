use {
    crate::{parser::Str, VarType},
    std::{
        collections::BTreeMap,
        fmt::{Display, Formatter, Result as FmtResult},
    },
};

/// The snapshot point a [Block] was captured at while the legacy interpreter
/// processed one file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockType {
    /// State on entry to the file.
    Before,

    /// State at an inherit-product call, before the call takes effect.
    Inherit,

    /// State after the last statement of the file.
    After,
}

impl BlockType {
    /// Parse a block type as it appears in dump `val` rows.
    pub fn from_dump(name: &str) -> Option<Self> {
        match name {
            "before" => Some(Self::Before),
            "inherit" => Some(Self::Inherit),
            "after" => Some(Self::After),
            _ => None,
        }
    }

    /// The name used in dump `val` rows.
    pub fn dump_name(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Inherit => "inherit",
            Self::After => "after",
        }
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.dump_name())
    }
}

/// A snapshot of variable state captured at one point in a file.
#[derive(Clone, Debug)]
pub struct Block {
    /// The point the snapshot was captured at.
    pub block_type: BlockType,

    /// The file named by the inherit-product call. Only set for
    /// [BlockType::Inherit] blocks.
    pub inherited_file: Option<Str>,

    /// Variable values at the snapshot point.
    pub vars: BTreeMap<String, Str>,
}

impl Block {
    /// Create an empty snapshot of the given type.
    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
            inherited_file: None,
            vars: BTreeMap::new(),
        }
    }

    /// Create an empty inherit snapshot for the given inherited file.
    pub fn inherit(inherited_file: Str) -> Self {
        Self {
            block_type: BlockType::Inherit,
            inherited_file: Some(inherited_file),
            vars: BTreeMap::new(),
        }
    }
}

/// The ordered snapshots captured for one config file in a phase.
#[derive(Clone, Debug)]
pub struct MakeConfigFile {
    /// The file the snapshots were captured from.
    pub filename: String,

    /// Snapshots in capture order: `Before`, one `Inherit` per
    /// inherit-product call, then `After`.
    pub blocks: Vec<Block>,
}

/// One evaluation phase of a dump: the raw per-block variable-snapshot form
/// of the product configuration.
#[derive(Clone, Debug, Default)]
pub struct MakeConfig {
    /// The phase name, e.g. `PRODUCTS`.
    pub phase: String,

    /// The files flattening may start from.
    pub root_nodes: Vec<String>,

    /// Declared product variables.
    pub product_vars: BTreeMap<String, VarType>,

    /// The files imported during the phase, in import order.
    pub files: Vec<MakeConfigFile>,
}

impl MakeConfig {
    /// The declared type of `name`, or [VarType::Unknown] if undeclared.
    #[inline(always)]
    pub fn var_type(&self, name: &str) -> VarType {
        self.product_vars.get(name).copied().unwrap_or_default()
    }
}
