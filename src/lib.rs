//! A small command interpreter that runs scripts serially or in parallel.
//!
//! Lines are read from an interactive console, a local file or an `http://`
//! URL. Each line is split into words and launched as a child process. A line
//! `SERIAL <fileOrUrl>` runs a nested script whose commands are awaited one by
//! one; `PARALLEL <fileOrUrl>` starts all of a script's commands first and
//! awaits them together when the script ends. Scripts may nest to any depth up
//! to [`Options::max_depth`].
//!
//! The main entry point is [`Interpreter`]. The [`command`] module defines the
//! [`Launcher`](command::Launcher) seam used to start processes and [`fetch`]
//! the [`ScriptSource`](fetch::ScriptSource) seam used to open scripts.

pub mod command;
mod console;
pub mod fetch;
mod interpreter;
mod io_adapters;
pub mod launcher;
pub mod tokenizer;
pub mod url;

pub use console::Console;
pub use fetch::BufLines;
pub use interpreter::{Interpreter, Mode, Options};
pub use io_adapters::MemWriter;
