/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Command name followed by its arguments, exactly as handed to the launcher.
pub type ArgList = Vec<String>;

/// A child process that has been started and not yet awaited.
///
/// `wait` takes the handle by value, so every handle is awaited exactly once
/// and dropped afterwards.
pub trait RunningCommand {
    /// Block until the process terminates and return its exit status.
    ///
    /// Failures to start are reported here as a non-zero code rather than
    /// as an error.
    fn wait(self: Box<Self>) -> ExitCode;
}

/// Starts child processes for the interpreter.
///
/// The default implementation is [`crate::launcher::SystemLauncher`];
/// tests plug in recording fakes.
pub trait Launcher {
    /// Start `argv[0]` with `argv` as its full argument vector.
    ///
    /// The child inherits the standard streams of the interpreter.
    fn spawn(&self, argv: &[String]) -> Box<dyn RunningCommand>;
}
