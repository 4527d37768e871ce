use {
    crate::{make_config::MakeConfig, parser, parser::ConfigError},
    std::{
        io::Read,
        path::PathBuf,
        process::{Command, Stdio},
        thread,
    },
};

/// Number of stderr lines carried in a failure message.
const STDERR_TAIL_LINES: usize = 10;

/// An invocation of an external kati binary that evaluates the product
/// configuration entry point and writes a dumpconfig CSV.
#[derive(Clone, Debug)]
pub struct Kati {
    /// The kati binary to run.
    pub kati_bin: PathBuf,

    /// The entry-point makefile evaluated to produce the dump.
    pub makefile: PathBuf,

    /// `VAR=value` assignments passed on the command line.
    pub assignments: Vec<String>,

    /// Where the evaluation writes the dump.
    pub dump_file: PathBuf,
}

impl Kati {
    /// The argument list for the subprocess.
    fn args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.makefile.display().to_string()];
        args.push(format!("DUMPCONFIG_FILE={}", self.dump_file.display()));
        args.extend(self.assignments.iter().cloned());
        args
    }

    /// Run kati and parse the dump it produced, returning one [MakeConfig]
    /// per evaluation phase.
    pub fn run(&self) -> Result<Vec<MakeConfig>, ConfigError> {
        let args = self.args();
        log::debug!("running {} {}", self.kati_bin.display(), args.join(" "));

        let mut child = Command::new(&self.kati_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on their own threads so a chatty kati cannot
        // deadlock against a full pipe buffer. Both threads are joined
        // before this function returns; nothing outlives the call.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_thread = thread::spawn(move || drain(stdout_pipe));
        let stderr_thread = thread::spawn(move || drain(stderr_pipe));

        let status = child.wait()?;
        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        if !stdout.is_empty() {
            log::debug!("kati stdout:\n{stdout}");
        }
        if !status.success() {
            return Err(ConfigError::kati(format!(
                "{} exited with {status}: {}",
                self.kati_bin.display(),
                tail(&stderr)
            )));
        }

        parser::parse(&self.dump_file)
    }
}

/// Read a pipe to completion, returning whatever was written to it.
fn drain(pipe: Option<impl Read>) -> String {
    let mut out = String::new();
    if let Some(mut pipe) = pipe {
        _ = pipe.read_to_string(&mut out);
    }
    out
}

/// The last few lines of kati's stderr, for failure messages.
fn tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
