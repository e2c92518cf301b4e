use crate::command::{ExitCode, Launcher, RunningCommand};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use tracing::{debug, error};

/// Exit code reported when the executable cannot be found.
pub const NOT_FOUND: ExitCode = 127;

/// Exit code reported when the executable exists but could not be started.
pub const CANNOT_EXECUTE: ExitCode = 126;

/// Launches commands as operating system processes.
///
/// The command name is resolved against `PATH` the way a shell would and the
/// child inherits stdin, stdout, stderr, environment and working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn spawn(&self, argv: &[String]) -> Box<dyn RunningCommand> {
        let Some((name, args)) = argv.split_first() else {
            return Box::new(FailedCommand(NOT_FOUND));
        };

        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let Some(executable) = find_command_path(&search_paths, Path::new(name)) else {
            error!(command = %name, "command not found");
            return Box::new(FailedCommand(NOT_FOUND));
        };

        match Command::new(&*executable).args(args).spawn() {
            Ok(child) => {
                debug!(command = %name, pid = child.id(), "spawned");
                Box::new(SystemProcess(child))
            }
            Err(e) => {
                error!(command = %name, "failed to start: {e}");
                Box::new(FailedCommand(spawn_error_code(&e)))
            }
        }
    }
}

fn spawn_error_code(e: &io::Error) -> ExitCode {
    match e.kind() {
        io::ErrorKind::NotFound => NOT_FOUND,
        _ => CANNOT_EXECUTE,
    }
}

/// A running OS process.
struct SystemProcess(Child);

impl RunningCommand for SystemProcess {
    fn wait(mut self: Box<Self>) -> ExitCode {
        let pid = self.0.id();
        match self.0.wait() {
            Ok(status) => {
                debug!(pid, %status, "child exited");
                status_code(status)
            }
            Err(e) => {
                error!(pid, "failed to wait for child: {e}");
                -1
            }
        }
    }
}

/// Stands in for a process that never started; yields its code when awaited.
struct FailedCommand(ExitCode);

impl RunningCommand for FailedCommand {
    fn wait(self: Box<Self>) -> ExitCode {
        self.0
    }
}

fn status_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - `./foo`, or any path with several components: returned if it exists
///   relative to the current directory.
/// - Single component: the first executable match in `search_paths` (PATH).
/// - Empty path: `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
