//! Resolution of the inheritance graph into one variable environment.

use {
    crate::{
        generic_config::{Assign, ConfigFile, GenericConfig, Inherit, Statement},
        parser::{ConfigError, Position, Str},
        types::{Value, VarType},
    },
    std::collections::{BTreeMap, HashSet},
};

/// Variables always present in a flattened configuration, kept for
/// compatibility with the legacy product-config stage.
const LEGACY_DEFAULT_VARS: &[&str] = &[
    "PRODUCT_ENFORCE_PACKAGES_EXIST",
    "PRODUCT_ENFORCE_PACKAGES_EXIST_ALLOW_LIST",
];

/// A fully-resolved variable environment for one root product.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlatConfig {
    /// The phase this environment was flattened from.
    pub phase: String,

    /// The root nodes declared by the phase; the first one was flattened.
    pub root_nodes: Vec<String>,

    /// Declared product variables.
    pub product_vars: BTreeMap<String, VarType>,

    /// The resolved values.
    pub values: BTreeMap<String, Value>,
}

/// Resolve the inheritance graph of `generic`'s root node into one concrete
/// variable environment.
///
/// Zero declared roots is an error; more than one is a warning, and only
/// the first is flattened.
pub fn flatten(generic: &GenericConfig) -> Result<FlatConfig, ConfigError> {
    let Some(root) = generic.root_nodes.first() else {
        return Err(ConfigError::no_root_nodes());
    };
    if generic.root_nodes.len() > 1 {
        log::warn!(
            "ignoring extra root nodes in product configuration: {}",
            generic.root_nodes[1..].join(" ")
        );
    }

    let mut flattener = Flattener {
        generic,
        values: BTreeMap::new(),
    };

    flattener.flatten_list_vars(root)?;
    flattener.flatten_single_vars(root)?;
    flattener.flatten_unknown_vars(root)?;
    flattener.flatten_inherits_from(root, &Position::default())?;
    flattener.set_default_known_vars();

    let mut product_vars = generic.product_vars.clone();
    product_vars.insert("PRODUCTS".to_string(), VarType::Unknown);
    flattener.values.insert(
        "PRODUCTS".to_string(),
        Value::Unknown(Str::new(Position::new(root, None), root.clone())),
    );

    Ok(FlatConfig {
        phase: generic.phase.clone(),
        root_nodes: generic.root_nodes.clone(),
        product_vars,
        values: flattener.values,
    })
}

/// Traversal context for one [flatten] call. The recursion state proper
/// (ancestor stacks and seen sets) lives in explicit parameters so every
/// call starts from a clean slate.
struct Flattener<'a> {
    generic: &'a GenericConfig,
    values: BTreeMap<String, Value>,
}

impl<'a> Flattener<'a> {
    /// Look up a config file, failing with the position of the reference.
    fn file(&self, filename: &str, at: &Position) -> Result<&'a ConfigFile, ConfigError> {
        self.generic
            .files
            .get(filename)
            .ok_or_else(|| ConfigError::missing_config_file(filename, at.clone()))
    }

    /// The inherit statements of `file` in alphabetical order of the
    /// inherited filename. This is the recursion order for all the
    /// traversals below; value concatenation uses the statements' textual
    /// order instead.
    fn inherits_in_alphabetical_order(file: &ConfigFile) -> Vec<&Inherit> {
        let mut inherits: Vec<&Inherit> = file.inherits().collect();
        inherits.sort_by(|a, b| a.filename.as_str().cmp(b.filename.as_str()));
        inherits
    }

    /// Traverse the graph, resolving every list-typed variable.
    fn flatten_list_vars(&mut self, root: &str) -> Result<(), ConfigError> {
        let mut stack = Vec::new();
        let mut seen = HashSet::new();
        let vars = self.file_list_vars(root, &Position::default(), &mut stack, &mut seen)?;

        // No collisions are possible here: the other passes only write
        // single- and unknown-typed variables.
        self.values.extend(vars);
        Ok(())
    }

    /// Compute the list-variable environment of one file.
    ///
    /// `stack` is the chain of files currently being expanded; a file
    /// reappearing on it is an infinite recursion. `seen` holds every file
    /// expanded anywhere in this traversal: a file's value is expanded only
    /// once, and re-encountering it yields nothing.
    fn file_list_vars(
        &self,
        filename: &str,
        at: &Position,
        stack: &mut Vec<String>,
        seen: &mut HashSet<String>,
    ) -> Result<BTreeMap<String, Value>, ConfigError> {
        if stack.iter().any(|ancestor| ancestor == filename) {
            return Err(ConfigError::infinite_recursion(filename, at.clone()));
        }
        if !seen.insert(filename.to_string()) {
            return Ok(BTreeMap::new());
        }

        let file = self.file(filename, at)?;

        // Recurse into inherited files first, in alphabetical order. This
        // decides which inherit site a file shared between several parents
        // is expanded at.
        stack.push(filename.to_string());
        let mut inherited: BTreeMap<&str, BTreeMap<String, Value>> = BTreeMap::new();
        for inherit in Self::inherits_in_alphabetical_order(file) {
            let child = inherit.filename.as_str();
            if !inherited.contains_key(child) {
                let vars = self.file_list_vars(child, &inherit.filename.position, stack, seen)?;
                inherited.insert(child, vars);
            }
        }
        stack.pop();

        // Now walk the statements in textual order, building the result.
        let mut result: BTreeMap<String, Value> = BTreeMap::new();
        for statement in &file.statements {
            match statement {
                Statement::Assign(assign) => {
                    if self.generic.var_type(&assign.name) != VarType::List {
                        continue;
                    }
                    let mut words = Vec::new();
                    flatten_assign_list(assign, result.get(&assign.name), &mut words)?;
                    result.insert(assign.name.clone(), Value::List(words));
                }
                Statement::Inherit(inherit) => {
                    // The first textual site for a child consumes its
                    // values; repeated sites contribute nothing.
                    let Some(vars) = inherited.remove(inherit.filename.as_str()) else {
                        continue;
                    };
                    for (name, value) in vars {
                        append_list_value(&mut result, name, value, &inherit.filename.position)?;
                    }
                }
            }
        }

        Ok(result)
    }

    /// Traverse the graph, resolving every single-typed variable.
    fn flatten_single_vars(&mut self, root: &str) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        self.file_single_vars(root, &Position::default(), &mut seen)
    }

    /// First write wins globally: a file's own assignments are recorded
    /// before its inherited files are visited.
    fn file_single_vars(
        &mut self,
        filename: &str,
        at: &Position,
        seen: &mut HashSet<String>,
    ) -> Result<(), ConfigError> {
        if !seen.insert(filename.to_string()) {
            return Ok(());
        }
        let file = self.file(filename, at)?;

        for statement in &file.statements {
            let Statement::Assign(assign) = statement else { continue };
            if self.generic.var_type(&assign.name) != VarType::Single {
                continue;
            }
            if self.values.contains_key(&assign.name) {
                continue;
            }

            let [value] = assign.value.as_slice() else {
                return Err(single_value_fault(assign));
            };
            self.values
                .insert(assign.name.clone(), Value::Single(value.clone()));
        }

        for inherit in Self::inherits_in_alphabetical_order(file) {
            self.file_single_vars(inherit.filename.as_str(), &inherit.filename.position, seen)?;
        }
        Ok(())
    }

    /// Traverse the graph, resolving every unknown-typed variable.
    fn flatten_unknown_vars(&mut self, root: &str) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        self.file_unknown_vars(root, &Position::default(), &mut seen)
    }

    /// Last write wins: this file's assignments are applied before its
    /// inherited files are visited, so a descendant evaluated later
    /// overwrites them. The file closest to the root does not win.
    fn file_unknown_vars(
        &mut self,
        filename: &str,
        at: &Position,
        seen: &mut HashSet<String>,
    ) -> Result<(), ConfigError> {
        if !seen.insert(filename.to_string()) {
            return Ok(());
        }
        let file = self.file(filename, at)?;

        for statement in &file.statements {
            let Statement::Assign(assign) = statement else { continue };
            if self.generic.var_type(&assign.name) != VarType::Unknown {
                continue;
            }

            // Conversion emits unknown assignments as a single chunk;
            // joining is the degenerate identity.
            let text: String = assign.value.iter().map(Str::as_str).collect();
            let position = assign
                .value
                .first()
                .map(|value| value.position.clone())
                .unwrap_or_default();
            self.values
                .insert(assign.name.clone(), Value::Unknown(Str::new(position, text)));
        }

        for inherit in Self::inherits_in_alphabetical_order(file) {
            self.file_unknown_vars(inherit.filename.as_str(), &inherit.filename.position, seen)?;
        }
        Ok(())
    }

    /// Synthesize `PRODUCTS.<filename>.INHERITS_FROM` for every file
    /// reachable from the root.
    ///
    /// Unlike the passes above, every node is visited regardless of prior
    /// visitation: this is per-node structure, not a flattened value. The
    /// list pass has already rejected cyclic graphs.
    fn flatten_inherits_from(&mut self, filename: &str, at: &Position) -> Result<(), ConfigError> {
        let file = self.file(filename, at)?;

        let mut children: BTreeMap<&str, &Position> = BTreeMap::new();
        for inherit in file.inherits() {
            children
                .entry(inherit.filename.as_str())
                .or_insert(&inherit.filename.position);
        }

        let name = format!("PRODUCTS.{filename}.INHERITS_FROM");
        if children.is_empty() {
            // A leaf has no such variable at all, even if the unknown pass
            // recorded an assignment to it.
            self.values.remove(&name);
        } else {
            let joined = children.keys().copied().collect::<Vec<_>>().join(" ");
            self.values.insert(
                name,
                Value::Unknown(Str::new(Position::new(filename, None), joined)),
            );
        }

        for (child, position) in &children {
            self.flatten_inherits_from(child, position)?;
        }
        Ok(())
    }

    /// Give every declared product variable absent from the result its
    /// type-appropriate empty default, plus the legacy compatibility
    /// variables.
    fn set_default_known_vars(&mut self) {
        let generic = self.generic;
        for (name, var_type) in &generic.product_vars {
            if !self.values.contains_key(name) {
                self.values.insert(name.clone(), Value::empty(*var_type));
            }
        }

        for name in LEGACY_DEFAULT_VARS {
            if !self.values.contains_key(*name) {
                self.values
                    .insert((*name).to_string(), Value::empty(VarType::Unknown));
            }
        }
    }
}

/// Rebuild a list variable from one assignment. The chunks of the stored
/// value are separated by implicit references to the variable's prior
/// value, each of which expands to the running value computed so far.
fn flatten_assign_list(
    assign: &Assign,
    previous: Option<&Value>,
    out: &mut Vec<Str>,
) -> Result<(), ConfigError> {
    for (index, chunk) in assign.value.iter().enumerate() {
        if index > 0 {
            match previous {
                None => {}
                Some(Value::List(words)) => out.extend(words.iter().cloned()),
                Some(_) => {
                    return Err(ConfigError::mismatched_type(
                        &assign.name,
                        VarType::List,
                        "its prior value is not a list",
                        chunk.position.clone(),
                    ));
                }
            }
        }
        append_words(out, chunk);
    }
    Ok(())
}

/// Append the tokens of an inherited list value onto the running value.
fn append_list_value(
    result: &mut BTreeMap<String, Value>,
    name: String,
    value: Value,
    at: &Position,
) -> Result<(), ConfigError> {
    let Value::List(words) = value else {
        return Err(ConfigError::mismatched_type(
            &name,
            VarType::List,
            "an inherited value of another type was recorded",
            at.clone(),
        ));
    };

    match result.get_mut(&name) {
        None => {
            result.insert(name, Value::List(words));
        }
        Some(Value::List(existing)) => existing.extend(words),
        Some(_) => {
            return Err(ConfigError::mismatched_type(
                &name,
                VarType::List,
                "its running value is not a list",
                at.clone(),
            ));
        }
    }
    Ok(())
}

/// Append the whitespace-separated words of `chunk` to `out`, each carrying
/// the chunk's position.
fn append_words(out: &mut Vec<Str>, chunk: &Str) {
    for word in chunk.as_str().split_ascii_whitespace() {
        out.push(Str::new(chunk.position.clone(), word));
    }
}

/// The fault for a single-typed assignment that does not carry exactly one
/// value. This is a producer bug, not bad input.
fn single_value_fault(assign: &Assign) -> ConfigError {
    let position = assign
        .value
        .first()
        .map(|value| value.position.clone())
        .unwrap_or_default();
    ConfigError::mismatched_type(
        &assign.name,
        VarType::Single,
        format!("the assignment carries {} values", assign.value.len()),
        position,
    )
}
