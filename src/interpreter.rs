use crate::command::{Launcher, RunningCommand};
use crate::fetch::{LineSource, ScriptFetcher, ScriptSource};
use crate::launcher::SystemLauncher;
use crate::tokenizer;
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};

/// Line that ends the current input.
const EXIT_LINE: &str = "exit";

/// How the commands of one input are awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Each command is awaited before the next line is read.
    Serial,
    /// Commands are started without waiting and awaited together, in start
    /// order, once the input ends.
    Parallel,
}

impl Mode {
    /// Recognise a `SERIAL` or `PARALLEL` directive word.
    pub fn from_directive(word: &str) -> Option<Self> {
        match word {
            "SERIAL" => Some(Mode::Serial),
            "PARALLEL" => Some(Mode::Parallel),
            _ => None,
        }
    }
}

/// Tunables for an [`Interpreter`].
#[derive(Debug, Clone)]
pub struct Options {
    /// How many scripts may be nested inside one another. A directive that
    /// would go deeper is skipped.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Reads command lines and runs each one as a child process.
///
/// `SERIAL <fileOrUrl>` and `PARALLEL <fileOrUrl>` lines run a nested script
/// in the given mode. A nested script is processed to completion, including
/// awaiting its parallel children, before the line after the directive is read.
///
/// Every started command is announced as `Running: <argv>` and every awaited
/// one as `Exit code: <n>` on the report output.
///
/// Example
/// ```
/// use script_shell::{BufLines, Interpreter, MemWriter, Mode};
/// use script_shell::launcher::SystemLauncher;
/// use script_shell::fetch::ScriptFetcher;
///
/// let out = MemWriter::new();
/// let mut sh = Interpreter::new(
///     Box::new(SystemLauncher),
///     Box::new(ScriptFetcher),
///     Box::new(out.clone()),
/// );
/// let mut input = BufLines::new("# nothing to run\n\nexit\n".as_bytes());
/// sh.process(&mut input, "", Mode::Serial);
/// assert_eq!(out.contents(), "");
/// ```
pub struct Interpreter {
    launcher: Box<dyn Launcher>,
    scripts: Box<dyn ScriptSource>,
    out: Box<dyn Write>,
    options: Options,
    depth: usize,
}

impl Interpreter {
    /// Create an interpreter that starts commands with `launcher`, opens
    /// nested scripts with `scripts` and writes reports to `out`.
    pub fn new(
        launcher: Box<dyn Launcher>,
        scripts: Box<dyn ScriptSource>,
        out: Box<dyn Write>,
    ) -> Self {
        Self {
            launcher,
            scripts,
            out,
            options: Options::default(),
            depth: 0,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Process `input` until it is exhausted or an `exit` line is read.
    ///
    /// `prompt` is shown before every read unless it is empty. In
    /// [`Mode::Parallel`] the children started from this input are awaited
    /// when it ends; they are never handed to another invocation.
    pub fn process(&mut self, input: &mut dyn LineSource, prompt: &str, mode: Mode) {
        let mut pending: Vec<Box<dyn RunningCommand>> = Vec::new();

        while let Some(line) = input.read_line(prompt, self.out.as_mut()) {
            if line == EXIT_LINE {
                break;
            }
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let argv = tokenizer::split(&line);
            let Some(name) = argv.first() else {
                continue;
            };

            match Mode::from_directive(name) {
                Some(script_mode) => match argv.get(1) {
                    Some(target) => self.run_script(target, script_mode),
                    None => warn!(directive = %name, "missing script argument, line ignored"),
                },
                None => {
                    let child = self.start(&argv);
                    match mode {
                        Mode::Serial => self.report_exit(child),
                        Mode::Parallel => pending.push(child),
                    }
                }
            }
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "awaiting parallel commands");
        }
        for child in pending {
            self.report_exit(child);
        }
    }

    /// Open `file_or_url` and process it in `mode` with no prompt.
    pub fn run_script(&mut self, file_or_url: &str, mode: Mode) {
        if self.depth >= self.options.max_depth {
            warn!(
                script = %file_or_url,
                max_depth = self.options.max_depth,
                "scripts nested too deeply, directive ignored"
            );
            return;
        }

        debug!(script = %file_or_url, ?mode, depth = self.depth, "running script");
        let mut script = self.scripts.open(file_or_url);
        self.depth += 1;
        self.process(script.as_mut(), "", mode);
        self.depth -= 1;
    }

    fn start(&mut self, argv: &[String]) -> Box<dyn RunningCommand> {
        self.report(format_args!("Running: {}", argv.join(" ")));
        self.launcher.spawn(argv)
    }

    fn report_exit(&mut self, child: Box<dyn RunningCommand>) {
        let code = child.wait();
        self.report(format_args!("Exit code: {code}"));
    }

    fn report(&mut self, line: fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("failed to write report: {e}");
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter that launches OS processes, fetches scripts from
    /// files and `http://` URLs and reports to standard output.
    fn default() -> Self {
        Self::new(
            Box::new(SystemLauncher),
            Box::new(ScriptFetcher),
            Box::new(std::io::stdout()),
        )
    }
}
