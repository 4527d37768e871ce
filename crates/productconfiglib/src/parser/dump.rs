//! Interpreter for dumpconfig rows, rebuilding the per-phase config trees.

use {
    crate::{
        make_config::{Block, BlockType, MakeConfig, MakeConfigFile},
        parser::{csv, ConfigError, Position, Str},
        VarType,
    },
    phf::phf_map,
};

/// Lowest dumpconfig format version this parser understands.
const MIN_VERSION: u32 = 1;

/// Highest dumpconfig format version this parser understands.
const MAX_VERSION: u32 = 1;

/// Minimum number of fields, not counting the row type itself, for each
/// known row type. Known rows that are too short are dropped with a
/// warning; unknown row types are skipped silently.
static LINE_TYPES: phf::Map<&'static str, usize> = phf_map! {
    "dumpconfig_version" => 1,
    "phase" => 2,
    "var" => 2,
    "import" => 1,
    "val" => 5,
    "inherit" => 3,
    "imported" => 1,
};

/// Reconstructs per-phase [MakeConfig] trees from the rows of a dumpconfig
/// CSV trace.
#[derive(Debug)]
pub struct DumpConfigParser<'a> {
    filename: &'a str,
    configs: Vec<MakeConfig>,
    seen_version: bool,
}

impl<'a> DumpConfigParser<'a> {
    /// Parse `data`, the contents of the dump file `filename`, returning one
    /// [MakeConfig] per evaluation phase, in dump order.
    pub fn parse(filename: &'a str, data: &str) -> Result<Vec<MakeConfig>, ConfigError> {
        let rows = csv::parse(filename, data)?;

        let mut parser = Self {
            filename,
            configs: Vec::new(),
            seen_version: false,
        };

        for row in &rows {
            parser.row(row)?;
        }

        if !parser.seen_version {
            return Err(ConfigError::dump_format(
                "no dumpconfig_version row",
                Position::new(filename, None),
            ));
        }

        Ok(parser.configs)
    }

    fn row(&mut self, row: &csv::Line) -> Result<(), ConfigError> {
        let Some((line_type, fields)) = row.fields.split_first() else {
            return Ok(());
        };
        let pos = Position::new(self.filename, Some(row.line));

        let Some(&min_fields) = LINE_TYPES.get(line_type.as_str()) else {
            log::debug!("{pos}: ignoring unknown row type {line_type:?}");
            return Ok(());
        };
        if fields.len() < min_fields {
            log::warn!(
                "{pos}: {line_type} row has {} fields, expected at least {min_fields}",
                fields.len()
            );
            return Ok(());
        }

        if !self.seen_version {
            // Everything before the version row is preamble.
            if line_type == "dumpconfig_version" {
                self.version_row(fields, &pos)?;
            }
            return Ok(());
        }

        match line_type.as_str() {
            "dumpconfig_version" => log::warn!("{pos}: duplicate dumpconfig_version row"),
            "phase" => self.phase_row(fields),
            "var" => self.var_row(fields, &pos),
            "import" => self.import_row(fields, &pos),
            "val" => self.val_row(fields, &pos),
            "inherit" => self.inherit_row(fields, &pos),
            "imported" => self.imported_row(fields, &pos),
            _ => {}
        }

        Ok(())
    }

    fn version_row(&mut self, fields: &[String], pos: &Position) -> Result<(), ConfigError> {
        let Ok(version) = fields[0].parse::<u32>() else {
            log::warn!("{pos}: unparseable dumpconfig version {:?}", fields[0]);
            return Ok(());
        };

        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(ConfigError::unsupported_version(version, pos.clone()));
        }

        self.seen_version = true;
        Ok(())
    }

    fn phase_row(&mut self, fields: &[String]) {
        self.configs.push(MakeConfig {
            phase: fields[0].clone(),
            root_nodes: split_list(&fields[1]),
            ..Default::default()
        });
    }

    /// The phase the current rows belong to, if a `phase` row has been seen.
    fn config(&mut self, pos: &Position) -> Option<&mut MakeConfig> {
        if self.configs.is_empty() {
            log::warn!("{pos}: row before any phase row");
        }
        self.configs.last_mut()
    }

    /// The file the current rows belong to, if an `import` row has been seen.
    fn file(&mut self, pos: &Position) -> Option<&mut MakeConfigFile> {
        let file = self.config(pos)?.files.last_mut();
        if file.is_none() {
            log::warn!("{pos}: row before any import row");
        }
        file
    }

    fn var_row(&mut self, fields: &[String], pos: &Position) {
        let Some(var_type) = VarType::from_dump(&fields[0]) else {
            log::warn!("{pos}: unknown variable type {:?}", fields[0]);
            return;
        };
        let Some(config) = self.config(pos) else { return };

        config.product_vars.insert(fields[1].clone(), var_type);
    }

    fn import_row(&mut self, fields: &[String], pos: &Position) {
        let stack = split_list(&fields[0]);
        let Some(filename) = stack.first() else {
            log::warn!("{pos}: import row with an empty stack");
            return;
        };
        let Some(config) = self.config(pos) else { return };

        if config.files.iter().any(|f| &f.filename == filename) {
            log::warn!("{pos}: file {filename:?} imported more than once");
        }

        config.files.push(MakeConfigFile {
            filename: filename.clone(),
            blocks: vec![Block::new(BlockType::Before)],
        });
    }

    fn val_row(&mut self, fields: &[String], pos: &Position) {
        let Some(block_type) = BlockType::from_dump(&fields[1]) else {
            log::warn!("{pos}: unknown block type {:?}", fields[1]);
            return;
        };
        let value = Str::new(Position::parse(&fields[4]), fields[3].clone());

        let Some(file) = self.file(pos) else { return };
        if file.filename != fields[0] {
            log::warn!("{pos}: val row for {:?} inside {:?}", fields[0], file.filename);
            return;
        }

        // Before and inherit values attach to the open block of the same
        // type; the first after value closes whatever was open.
        let Some(open) = file.blocks.last().map(|block| block.block_type) else {
            return;
        };
        match (open, block_type) {
            (open, wanted) if open == wanted => {}
            (BlockType::Before | BlockType::Inherit, BlockType::After) => {
                file.blocks.push(Block::new(BlockType::After));
            }
            (open, wanted) => {
                log::warn!("{pos}: out-of-order {wanted} value in a {open} block");
                return;
            }
        }

        if let Some(block) = file.blocks.last_mut() {
            block.vars.insert(fields[2].clone(), value);
        }
    }

    fn inherit_row(&mut self, fields: &[String], pos: &Position) {
        let inherited = Str::new(Position::parse(&fields[2]), fields[1].clone());

        let Some(file) = self.file(pos) else { return };
        if file.filename != fields[0] {
            log::warn!("{pos}: inherit row for {:?} inside {:?}", fields[0], file.filename);
            return;
        }

        file.blocks.push(Block::inherit(inherited));
    }

    /// Cross-check an `imported` row against the files actually seen. The
    /// row is informational; mismatches are warnings only.
    fn imported_row(&mut self, fields: &[String], pos: &Position) {
        let names = split_list(&fields[0]);
        let Some(config) = self.config(pos) else { return };

        for name in names {
            if !config.files.iter().any(|f| f.filename == name) {
                log::warn!("{pos}: imported file {name:?} has no import row");
            }
        }
    }
}

/// Split a space-joined list field into its entries.
fn split_list(field: &str) -> Vec<String> {
    field.split_ascii_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use {
        super::DumpConfigParser,
        crate::{make_config::BlockType, parser::ConfigErrorKind, VarType},
    };

    const DUMP: &str = "\
junk,that,predates,the,version,row
dumpconfig_version,1
phase,PRODUCTS,device/a/root.mk
var,list,PRODUCT_PACKAGES
var,single,PRODUCT_NAME
import,device/a/root.mk
val,device/a/root.mk,before,PRODUCT_PACKAGES,,device/a/root.mk
inherit,device/a/root.mk,device/a/base.mk,device/a/root.mk:4
val,device/a/root.mk,inherit,PRODUCT_PACKAGES,alpha,device/a/root.mk:2
val,device/a/root.mk,after,PRODUCT_PACKAGES,alpha beta,device/a/root.mk:6
val,device/a/root.mk,after,PRODUCT_NAME,aosp,device/a/root.mk:7
import,device/a/base.mk
val,device/a/base.mk,after,PRODUCT_PACKAGES,gamma,device/a/base.mk:2
imported,device/a/root.mk device/a/base.mk
";

    #[test]
    fn parses_phases_files_and_blocks() {
        let configs = DumpConfigParser::parse("test.csv", DUMP).unwrap();
        assert_eq!(configs.len(), 1);

        let config = &configs[0];
        assert_eq!(config.phase, "PRODUCTS");
        assert_eq!(config.root_nodes, vec!["device/a/root.mk"]);
        assert_eq!(config.var_type("PRODUCT_PACKAGES"), VarType::List);
        assert_eq!(config.var_type("PRODUCT_NAME"), VarType::Single);
        assert_eq!(config.var_type("UNDECLARED"), VarType::Unknown);

        assert_eq!(config.files.len(), 2);
        let root = &config.files[0];
        assert_eq!(root.filename, "device/a/root.mk");
        assert_eq!(root.blocks.len(), 3);
        assert_eq!(root.blocks[0].block_type, BlockType::Before);
        assert_eq!(root.blocks[1].block_type, BlockType::Inherit);
        assert_eq!(
            root.blocks[1].inherited_file.as_ref().map(|f| f.as_str()),
            Some("device/a/base.mk")
        );
        assert_eq!(root.blocks[1].vars["PRODUCT_PACKAGES"].as_str(), "alpha");
        assert_eq!(root.blocks[2].block_type, BlockType::After);
        assert_eq!(root.blocks[2].vars["PRODUCT_PACKAGES"].as_str(), "alpha beta");
        assert_eq!(root.blocks[2].vars["PRODUCT_NAME"].as_str(), "aosp");

        let base = &config.files[1];
        assert_eq!(base.blocks.len(), 2);
        assert_eq!(base.blocks[1].vars["PRODUCT_PACKAGES"].as_str(), "gamma");
    }

    #[test]
    fn val_positions_are_parsed() {
        let configs = DumpConfigParser::parse("test.csv", DUMP).unwrap();
        let root = &configs[0].files[0];
        let value = &root.blocks[2].vars["PRODUCT_PACKAGES"];
        assert_eq!(value.position.file.as_deref(), Some("device/a/root.mk"));
        assert_eq!(value.position.line, Some(6));
    }

    #[test]
    fn missing_version_row_is_fatal() {
        let e = DumpConfigParser::parse("test.csv", "phase,PRODUCTS,root.mk\n").unwrap_err();
        assert!(matches!(e.kind, ConfigErrorKind::DumpFormat(_)));
    }

    #[test]
    fn unsupported_version_is_fatal() {
        let e = DumpConfigParser::parse("test.csv", "dumpconfig_version,99\n").unwrap_err();
        assert!(matches!(e.kind, ConfigErrorKind::UnsupportedVersion(99)));
    }

    #[test]
    fn short_and_misplaced_rows_are_dropped() {
        let dump = "\
dumpconfig_version,1
phase,PRODUCTS,root.mk
val,too-short
import,root.mk
val,other.mk,after,FOO,x,other.mk:1
something_new,with,fields
";
        let configs = DumpConfigParser::parse("test.csv", dump).unwrap();
        let root = &configs[0].files[0];
        // Only the before block from the import; both val rows were dropped.
        assert_eq!(root.blocks.len(), 1);
        assert!(root.blocks[0].vars.is_empty());
    }

    #[test]
    fn out_of_order_block_values_are_dropped() {
        let dump = "\
dumpconfig_version,1
phase,PRODUCTS,root.mk
import,root.mk
val,root.mk,after,FOO,x,root.mk:1
val,root.mk,before,FOO,y,root.mk:2
";
        let configs = DumpConfigParser::parse("test.csv", dump).unwrap();
        let root = &configs[0].files[0];
        assert_eq!(root.blocks.len(), 2);
        // The late before value was dropped, not merged.
        assert!(root.blocks[0].vars.is_empty());
        assert_eq!(root.blocks[1].vars["FOO"].as_str(), "x");
    }
}
