use crate::fetch::LineSource;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// Interactive terminal input with line editing and history.
pub struct Console {
    editor: DefaultEditor,
}

impl Console {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for Console {
    /// The prompt goes straight to the terminal through rustyline.
    ///
    /// Ctrl-C abandons the current line and yields an empty one; Ctrl-D ends
    /// the session.
    fn read_line(&mut self, prompt: &str, out: &mut dyn Write) -> Option<String> {
        if let Err(e) = out.flush() {
            tracing::warn!("failed to flush output: {e}");
        }
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        tracing::warn!("failed to add history entry: {e}");
                    }
                }
                Some(line)
            }
            Err(ReadlineError::Interrupted) => Some(String::new()),
            Err(ReadlineError::Eof) => None,
            Err(err) => {
                tracing::warn!("failed to read line: {err}");
                None
            }
        }
    }
}
