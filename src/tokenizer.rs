//! Splitting of command lines into argument words.
//!
//! Words are separated by spaces and tabs. A word that starts with `"` runs to
//! the matching closing `"`, may contain whitespace and loses its delimiters;
//! inside it a backslash escapes `"` and `\`. Text right after the closing
//! quote starts a new word. Anywhere else `"` and `'` are ordinary characters,
//! so `don't` stays one word. An unterminated quote swallows the rest of the
//! line, so splitting never fails.

use crate::command::ArgList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitState {
    Start,
    ReadingWord,
    ReadingQuoted,
    ReadingEscape,
}

struct SplitFSM {
    input: Vec<char>,
    pos: usize,
    state: SplitState,
    /// Set once the current word has started, even if it is still empty (`""`).
    in_word: bool,
    buffer: String,
}

impl SplitFSM {
    fn new(line: &str) -> Self {
        SplitFSM {
            input: line.chars().collect(),
            pos: 0,
            state: SplitState::Start,
            in_word: false,
            buffer: String::new(),
        }
    }

    fn make_words(&mut self) -> ArgList {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                SplitState::Start => self.handle_start(ch),
                SplitState::ReadingWord => self.handle_word(ch, &mut out),
                SplitState::ReadingQuoted => self.handle_quoted(ch, &mut out),
                SplitState::ReadingEscape => {
                    self.buffer.push(ch);
                    self.state = SplitState::ReadingQuoted;
                }
            }
        }

        self.finish_word(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            ' ' | '\t' | '\r' | '\n' => {}
            '"' => {
                self.in_word = true;
                self.state = SplitState::ReadingQuoted;
            }
            c => {
                self.in_word = true;
                self.buffer.push(c);
                self.state = SplitState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut ArgList) {
        match ch {
            ' ' | '\t' | '\r' | '\n' => {
                self.finish_word(out);
                self.state = SplitState::Start;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_quoted(&mut self, ch: char, out: &mut ArgList) {
        match ch {
            '"' => {
                self.finish_word(out);
                self.state = SplitState::Start;
            }
            '\\' if matches!(self.peek_char(), Some('"' | '\\')) => {
                self.state = SplitState::ReadingEscape
            }
            c => self.buffer.push(c),
        }
    }

    fn finish_word(&mut self, out: &mut ArgList) {
        if self.in_word {
            out.push(std::mem::take(&mut self.buffer));
            self.in_word = false;
        }
    }
}

/// Split `line` into argument words.
///
/// Empty or all-blank input yields an empty list.
pub fn split(line: &str) -> ArgList {
    SplitFSM::new(line).make_words()
}

#[cfg(test)]
mod tests {
    use super::split;

    #[test]
    fn empty_line_has_no_words() {
        assert!(split("").is_empty());
        assert!(split("  \t ").is_empty());
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split("a b"), vec!["a", "b"]);
        assert_eq!(split("  ls\t-l   /tmp  "), vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn quoted_run_is_one_word() {
        assert_eq!(split("a \"b c\" d"), vec!["a", "b c", "d"]);
        assert_eq!(split("echo \"hello   world\""), vec!["echo", "hello   world"]);
    }

    #[test]
    fn requoting_a_word_with_a_space_reproduces_it() {
        let word = "two words";
        let line = format!("cmd \"{word}\"");
        assert_eq!(split(&line), vec!["cmd", word]);
    }

    #[test]
    fn apostrophe_is_an_ordinary_character() {
        assert_eq!(split("echo don't stop"), vec!["echo", "don't", "stop"]);
        assert_eq!(split("echo 'hello world'"), vec!["echo", "'hello", "world'"]);
    }

    #[test]
    fn quote_inside_a_word_is_literal() {
        assert_eq!(split("a\"b c\"d"), vec!["a\"b", "c\"d"]);
        assert_eq!(split("--name=\"x\""), vec!["--name=\"x\""]);
    }

    #[test]
    fn closing_quote_ends_the_word() {
        assert_eq!(split("\"a b\"c"), vec!["a b", "c"]);
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(split("printf \"\" x"), vec!["printf", "", "x"]);
    }

    #[test]
    fn escapes_inside_double_quotes() {
        assert_eq!(split(r#"echo "say \"hi\"""#), vec!["echo", "say \"hi\""]);
        assert_eq!(split(r#"echo "a\\b""#), vec!["echo", "a\\b"]);
        assert_eq!(split(r#"echo "a\nb""#), vec!["echo", "a\\nb"]);
    }

    #[test]
    fn apostrophe_inside_quotes_is_kept() {
        assert_eq!(split("echo \"it's\""), vec!["echo", "it's"]);
    }

    #[test]
    fn unterminated_quote_consumes_rest_of_line() {
        assert_eq!(split("echo \"abc def"), vec!["echo", "abc def"]);
    }

    #[test]
    fn trailing_carriage_return_is_whitespace() {
        assert_eq!(split("sleep 1\r"), vec!["sleep", "1"]);
    }
}
