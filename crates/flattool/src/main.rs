//! Flatten a product configuration dump into a single variable environment.

use {
    clap::{builder::PossibleValue, Parser, ValueEnum},
    product_config_lib::{
        convert_make_to_generic, flatten, parser, FlatConfig, Kati, MakeConfig,
    },
    std::{
        error::Error,
        fs::File,
        io::{stdout, Result as IoResult, Write},
        path::PathBuf,
        process::exit,
    },
};

#[derive(Clone, Copy, Debug, Default)]
enum OutputFormat {
    /// Make-style assignment lines.
    #[default]
    Make,

    /// CSV rows of name, type, value.
    Csv,
}

impl ValueEnum for OutputFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Make, Self::Csv]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Make => PossibleValue::new("make").alias("mk").help("Make-style assignment lines"),
            Self::Csv => PossibleValue::new("csv").alias("CSV").help("CSV rows of name, type, value"),
        })
    }
}

/// Command line options for the flattener.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Options {
    /// An existing dumpconfig CSV file to read.
    #[arg(long, env = "PRODUCT_CONFIG_DUMP", conflicts_with = "makefile")]
    dump: Option<String>,

    /// The entry-point makefile to evaluate with kati when no dump is given.
    #[arg(long)]
    makefile: Option<String>,

    /// The kati binary used to evaluate the makefile.
    #[arg(long, env = "CKATI", default_value = "ckati")]
    kati: String,

    /// Where kati writes the dump. Defaults next to the makefile.
    #[arg(long)]
    dump_out: Option<String>,

    /// VAR=value assignments passed to kati.
    #[arg(long = "set", short = 'D', value_name = "VAR=VALUE")]
    assignments: Vec<String>,

    /// The evaluation phase to flatten.
    #[arg(long, default_value = "PRODUCTS")]
    phase: String,

    /// The format to write the flattened configuration in.
    #[arg(long, short, default_value = "make")]
    format: OutputFormat,

    /// The output file to write to.
    #[arg(long, short, default_value = "-")]
    output: String,
}

fn main() {
    env_logger::init();
    let options = Options::parse();

    if let Err(e) = run(&options) {
        eprintln!("{e}");
        exit(1);
    }
}

fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    let configs = load_configs(options)?;

    let Some(make) = configs.into_iter().find(|c| c.phase == options.phase) else {
        return Err(format!("no {:?} phase in dump", options.phase).into());
    };

    let generic = convert_make_to_generic(&make);
    let flat = flatten(&generic)?;
    log::debug!(
        "flattened {} variables for {}",
        flat.values.len(),
        flat.root_nodes.first().map(String::as_str).unwrap_or("<none>")
    );

    if options.output == "-" {
        write_flat(&mut stdout(), &flat, options.format)?;
    } else {
        let mut fd = File::create(expand(&options.output)?)?;
        write_flat(&mut fd, &flat, options.format)?;
    }
    Ok(())
}

/// Read the per-phase configs, either from an existing dump file or by
/// evaluating a makefile with kati.
fn load_configs(options: &Options) -> Result<Vec<MakeConfig>, Box<dyn Error>> {
    if let Some(dump) = &options.dump {
        return Ok(parser::parse(expand(dump)?)?);
    }

    let Some(makefile) = &options.makefile else {
        return Err("either --dump or --makefile is required".into());
    };
    let makefile = PathBuf::from(expand(makefile)?);
    let dump_file = match &options.dump_out {
        Some(path) => PathBuf::from(expand(path)?),
        None => makefile.with_extension("dumpconfig.csv"),
    };

    let kati = Kati {
        kati_bin: PathBuf::from(expand(&options.kati)?),
        makefile,
        assignments: options.assignments.clone(),
        dump_file,
    };
    Ok(kati.run()?)
}

/// Expand `~` and environment references in a path argument.
fn expand(path: &str) -> Result<String, Box<dyn Error>> {
    Ok(shellexpand::full(path)?.into_owned())
}

fn write_flat<W: Write>(writer: &mut W, flat: &FlatConfig, format: OutputFormat) -> IoResult<()> {
    match format {
        OutputFormat::Make => write_make(writer, flat),
        OutputFormat::Csv => write_csv(writer, flat),
    }
}

fn write_make<W: Write>(writer: &mut W, flat: &FlatConfig) -> IoResult<()> {
    for (name, value) in &flat.values {
        writeln!(writer, "{name} := {value}")?;
    }
    Ok(())
}

fn write_csv<W: Write>(writer: &mut W, flat: &FlatConfig) -> IoResult<()> {
    for (name, value) in &flat.values {
        writeln!(
            writer,
            "{},{},{}",
            csv_field(name),
            value.var_type(),
            csv_field(&value.to_string())
        )?;
    }
    Ok(())
}

/// Quote a CSV field if it contains a separator, quote, or line break.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
