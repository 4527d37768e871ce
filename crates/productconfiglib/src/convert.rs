use {
    crate::{
        generic_config::{Assign, ConfigFile, GenericConfig, Inherit, Statement},
        make_config::{Block, BlockType, MakeConfig, MakeConfigFile},
        parser::Str,
        VarType,
    },
    std::collections::BTreeMap,
};

/// Convert the raw per-block snapshot form of a phase into the normalized
/// statement-list form.
pub fn convert_make_to_generic(make: &MakeConfig) -> GenericConfig {
    let mut files = BTreeMap::new();

    for file in &make.files {
        if files
            .insert(file.filename.clone(), convert_file(make, file))
            .is_some()
        {
            log::warn!(
                "duplicate config file {:?} in phase {}; keeping the last",
                file.filename,
                make.phase
            );
        }
    }

    GenericConfig {
        phase: make.phase.clone(),
        root_nodes: make.root_nodes.clone(),
        product_vars: make.product_vars.clone(),
        files,
    }
}

/// Rebuild one file's statement list from its snapshots. The `Before` block
/// is the baseline and emits nothing by itself; each later snapshot emits
/// the assignments observed since the previous one, and `Inherit` snapshots
/// additionally emit the inherit call captured at that point.
fn convert_file(make: &MakeConfig, file: &MakeConfigFile) -> ConfigFile {
    let mut statements = Vec::new();
    let mut prev: Option<&Block> = None;

    for block in &file.blocks {
        if let Some(prev) = prev {
            diff_blocks(make, &prev.vars, &block.vars, &mut statements);
        }

        if block.block_type == BlockType::Inherit {
            if let Some(inherited) = &block.inherited_file {
                statements.push(Statement::Inherit(Inherit {
                    filename: inherited.clone(),
                }));
            }
        }

        prev = Some(block);
    }

    ConfigFile {
        filename: file.filename.clone(),
        statements,
    }
}

/// Emit an assignment for every variable whose text changed between two
/// consecutive snapshots.
fn diff_blocks(
    make: &MakeConfig,
    prev: &BTreeMap<String, Str>,
    current: &BTreeMap<String, Str>,
    out: &mut Vec<Statement>,
) {
    for (name, value) in current {
        let previous = prev.get(name);
        if previous.is_some_and(|p| p.as_str() == value.as_str()) {
            continue;
        }

        out.push(Statement::Assign(Assign {
            name: name.clone(),
            value: lower_assignment(make.var_type(name), previous, value),
        }));
    }
}

/// Lower one observed change to an [Assign] value.
///
/// A LIST variable whose new text contains its previous, non-empty text is a
/// self-referential append/prepend (`VAR := a $(VAR) b`); its value is the
/// new text split around every occurrence of the previous value, leaving the
/// prior-value references implicit between the chunks. Anything else is a
/// plain assignment carried as a single chunk.
fn lower_assignment(var_type: VarType, previous: Option<&Str>, value: &Str) -> Vec<Str> {
    if var_type == VarType::List {
        if let Some(previous) = previous {
            if !previous.as_str().is_empty() && value.as_str().contains(previous.as_str()) {
                return value
                    .as_str()
                    .split(previous.as_str())
                    .map(|chunk| Str::new(value.position.clone(), chunk))
                    .collect();
            }
        }
    }

    vec![value.clone()]
}
