//! Line streams for the interpreter and the fetcher that opens scripts.
//!
//! A script named by an `http://` URL is downloaded with a single plain
//! HTTP/1.1 GET; anything else is opened as a local file. Fetch failures are
//! logged and turn into an exhausted stream, so a broken script simply runs
//! zero commands.

use crate::url::{self, Url};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// A source of command lines.
pub trait LineSource {
    /// Display `prompt` unless it is empty, then read the next line without its
    /// line terminator. Returns `None` once the input is exhausted.
    fn read_line(&mut self, prompt: &str, out: &mut dyn Write) -> Option<String>;
}

/// Owned, type-erased line stream handed to one interpreter invocation.
pub type LineStream = Box<dyn LineSource>;

/// Opens scripts named by `SERIAL` and `PARALLEL` directives.
pub trait ScriptSource {
    /// Open `file_or_url` for reading. Never fails: an unreadable script is an
    /// empty stream.
    fn open(&self, file_or_url: &str) -> LineStream;
}

/// [`LineSource`] over any buffered reader (files, sockets, piped stdin).
///
/// The prompt is written to the interpreter's output before each read.
pub struct BufLines<R> {
    reader: R,
}

impl<R: BufRead> BufLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for BufLines<R> {
    fn read_line(&mut self, prompt: &str, out: &mut dyn Write) -> Option<String> {
        if !prompt.is_empty() {
            if let Err(e) = write!(out, "{prompt}").and_then(|()| out.flush()) {
                warn!("failed to write prompt: {e}");
            }
        }

        // Bytes, not `read_line`: a line that is not UTF-8 must not end the input.
        let mut bytes = Vec::new();
        match self.reader.read_until(b'\n', &mut bytes) {
            Ok(0) => None,
            Ok(_) => {
                let mut line = String::from_utf8_lossy(&bytes).into_owned();
                strip_line_ending(&mut line);
                Some(line)
            }
            Err(e) => {
                warn!("read failed, treating as end of input: {e}");
                None
            }
        }
    }
}

fn strip_line_ending(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    } else if line.ends_with('\r') {
        line.pop();
    }
}

/// A stream with no lines.
pub fn empty() -> LineStream {
    Box::new(BufLines::new(io::empty()))
}

/// Opens local files and `http://` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptFetcher;

impl ScriptSource for ScriptFetcher {
    fn open(&self, file_or_url: &str) -> LineStream {
        let opened = if file_or_url.starts_with("http://") {
            open_http(file_or_url)
        } else {
            open_file(file_or_url)
        };
        opened.unwrap_or_else(|e| {
            warn!(script = %file_or_url, "{e:#}");
            empty()
        })
    }
}

fn open_file(path: &str) -> Result<LineStream> {
    let file = File::open(path).with_context(|| format!("cannot open script {path:?}"))?;
    Ok(Box::new(BufLines::new(BufReader::new(file))))
}

fn open_http(address: &str) -> Result<LineStream> {
    let Url { host, port, path } = url::resolve(address);
    debug!(%host, %port, %path, "fetching script");

    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid port {port:?} in {address}"))?;
    let mut stream = TcpStream::connect((host.as_str(), port))
        .with_context(|| format!("cannot connect to {host}:{port}"))?;

    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: Close\r\n\r\n"
    )
    .and_then(|()| stream.flush())
    .with_context(|| format!("cannot send request for {address}"))?;

    let mut reader = BufReader::new(stream);
    skip_headers(&mut reader, address)?;
    Ok(Box::new(BufLines::new(reader)))
}

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^HTTP/\d(?:\.\d)?\s+(\d{3})\b").expect("status line pattern is valid")
});

fn status_code(line: &str) -> Option<u16> {
    STATUS_LINE
        .captures(line)
        .and_then(|caps| caps[1].parse().ok())
}

/// Consume the status line and headers, stopping after the first blank line
/// (or at end of stream). The status is only logged: the body of an error
/// response is still handed back as the script.
fn skip_headers(reader: &mut impl BufRead, address: &str) -> Result<()> {
    let mut line = String::new();
    let mut first = true;
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .with_context(|| format!("cannot read response headers from {address}"))?;
        if read == 0 {
            return Ok(());
        }
        strip_line_ending(&mut line);
        if line.is_empty() {
            return Ok(());
        }
        if first {
            first = false;
            match status_code(&line) {
                Some(code) if (200..300).contains(&code) => debug!(code, "response status"),
                Some(code) => warn!(code, url = %address, "non-success response, running body anyway"),
                None => warn!(url = %address, status_line = %line, "unrecognised status line"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn collect(mut stream: LineStream) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = stream.read_line("", &mut io::sink()) {
            lines.push(line);
        }
        lines
    }

    /// Serve one canned response and hand back the request that was received.
    fn serve_once(response: &'static str) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(socket.try_clone().expect("clone"));
            let mut request = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("read request") == 0 || line == "\r\n" {
                    request.push_str(&line);
                    break;
                }
                request.push_str(&line);
            }
            socket.write_all(response.as_bytes()).expect("write response");
            request
        });
        (port, handle)
    }

    #[test]
    fn buf_lines_strips_terminators() {
        let mut src = BufLines::new(Cursor::new("one\r\ntwo\nthree"));
        let mut sink = io::sink();
        assert_eq!(src.read_line("", &mut sink).as_deref(), Some("one"));
        assert_eq!(src.read_line("", &mut sink).as_deref(), Some("two"));
        assert_eq!(src.read_line("", &mut sink).as_deref(), Some("three"));
        assert_eq!(src.read_line("", &mut sink), None);
    }

    #[test]
    fn buf_lines_survives_invalid_utf8() {
        let mut src = BufLines::new(Cursor::new(b"true\n\xff\r\nfalse\n".to_vec()));
        let mut sink = io::sink();
        assert_eq!(src.read_line("", &mut sink).as_deref(), Some("true"));
        assert_eq!(src.read_line("", &mut sink).as_deref(), Some("\u{fffd}"));
        assert_eq!(src.read_line("", &mut sink).as_deref(), Some("false"));
        assert_eq!(src.read_line("", &mut sink), None);
    }

    #[test]
    fn buf_lines_shows_prompt() {
        let mut src = BufLines::new(Cursor::new("ls\n"));
        let mut out = Vec::new();
        assert_eq!(src.read_line("> ", &mut out).as_deref(), Some("ls"));
        assert_eq!(src.read_line("", &mut out), None);
        assert_eq!(out, b"> ");
    }

    #[test]
    fn opens_local_file() {
        let path = std::env::temp_dir().join(format!("fetch_test_script_{}", std::process::id()));
        std::fs::write(&path, "echo a\n# note\necho b\n").expect("write script");

        let lines = collect(ScriptFetcher.open(path.to_str().expect("utf8 path")));
        let _ = std::fs::remove_file(&path);

        assert_eq!(lines, vec!["echo a", "# note", "echo b"]);
    }

    #[test]
    fn missing_file_is_empty_stream() {
        let lines = collect(ScriptFetcher.open("/definitely/not/here/script.txt"));
        assert!(lines.is_empty());
    }

    #[test]
    fn http_fetch_sends_get_and_skips_headers() {
        let (port, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 20\r\n\r\necho one\r\necho two\r\n",
        );
        let lines = collect(ScriptFetcher.open(&format!("http://127.0.0.1:{port}/~user/s.txt")));
        let request = server.join().expect("server thread");

        assert_eq!(
            request,
            "GET /~user/s.txt HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: Close\r\n\r\n"
        );
        assert_eq!(lines, vec!["echo one", "echo two"]);
    }

    #[test]
    fn http_error_status_body_is_still_returned() {
        let (port, server) = serve_once("HTTP/1.1 404 Not Found\r\n\r\nnot found\n");
        let lines = collect(ScriptFetcher.open(&format!("http://127.0.0.1:{port}/missing")));
        server.join().expect("server thread");
        assert_eq!(lines, vec!["not found"]);
    }

    #[test]
    fn http_response_without_body_is_empty() {
        let (port, server) = serve_once("HTTP/1.1 204 No Content\r\nServer: test\r\n");
        let lines = collect(ScriptFetcher.open(&format!("http://127.0.0.1:{port}/")));
        server.join().expect("server thread");
        assert!(lines.is_empty());
    }

    #[test]
    fn refused_connection_is_empty_stream() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let lines = collect(ScriptFetcher.open(&format!("http://127.0.0.1:{port}/x")));
        assert!(lines.is_empty());
    }

    #[test]
    fn invalid_port_is_empty_stream() {
        let lines = collect(ScriptFetcher.open("http://127.0.0.1:notaport/x"));
        assert!(lines.is_empty());
    }

    #[test]
    fn status_line_parsing() {
        assert_eq!(status_code("HTTP/1.1 200 OK"), Some(200));
        assert_eq!(status_code("HTTP/1.0 404 Not Found"), Some(404));
        assert_eq!(status_code("HTTP/2 301"), Some(301));
        assert_eq!(status_code("garbage"), None);
    }

    #[test]
    fn header_skipping_leaves_body_unread() {
        let mut reader = BufReader::new(Cursor::new("HTTP/1.1 200 OK\r\nA: b\r\n\r\nbody\n"));
        skip_headers(&mut reader, "http://test/").expect("headers");
        let mut rest = String::new();
        reader.read_to_string(&mut rest).expect("body");
        assert_eq!(rest, "body\n");
    }
}
