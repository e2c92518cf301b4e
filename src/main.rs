use anyhow::{Context, Result};
use argh::FromArgs;
use script_shell::fetch::LineStream;
use script_shell::{BufLines, Console, Interpreter, Mode, Options};
use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(FromArgs)]
/// Run commands typed at the prompt, or run a script serially or in parallel.
///
/// Inside any input, `SERIAL <fileOrUrl>` and `PARALLEL <fileOrUrl>` run a
/// nested script. `exit` ends the current input.
struct Args {
    /// prompt shown before each interactive line; pass "" to hide it
    #[argh(option, default = "String::from(\"> \")")]
    prompt: String,

    /// run this file or http:// URL serially and exit
    #[argh(option)]
    serial: Option<String>,

    /// run this file or http:// URL in parallel and exit
    #[argh(option)]
    parallel: Option<String>,

    /// maximum nesting of SERIAL/PARALLEL scripts
    #[argh(option, default = "Options::default().max_depth")]
    max_depth: usize,

    /// read standard input without line editing
    #[argh(switch)]
    plain: bool,

    /// log debug information to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let mut sh = Interpreter::default().with_options(Options {
        max_depth: args.max_depth,
    });

    let script = match (&args.serial, &args.parallel) {
        (Some(_), Some(_)) => anyhow::bail!("--serial and --parallel are mutually exclusive"),
        (Some(target), None) => Some((target, Mode::Serial)),
        (None, Some(target)) => Some((target, Mode::Parallel)),
        (None, None) => None,
    };
    if let Some((target, mode)) = script {
        sh.run_script(target, mode);
        return Ok(());
    }

    let mut input: LineStream = if !args.plain && std::io::stdin().is_terminal() {
        Box::new(Console::new().context("failed to create line editor")?)
    } else {
        Box::new(BufLines::new(std::io::stdin().lock()))
    };
    sh.process(input.as_mut(), &args.prompt, Mode::Serial);
    Ok(())
}
