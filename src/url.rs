//! Decomposition of `scheme://host[:port][/path]` strings.

/// Port used when the URL does not name one.
pub const DEFAULT_PORT: &str = "80";

/// Host, port and path of a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub host: String,
    pub port: String,
    pub path: String,
}

/// Break `url` into host, port and path.
///
/// The host starts right after `//` (or at the beginning when there is no
/// `//`) and runs up to the first `:` or `/`. A `:` that comes before the first
/// `/` introduces the port; otherwise the port is [`DEFAULT_PORT`]. The path
/// starts at that first `/` and defaults to `/`. The scheme is not inspected
/// and malformed input is decomposed on a best-effort basis.
pub fn resolve(url: &str) -> Url {
    let host_start = url.find("//").map_or(0, |i| i + 2);
    let rest = &url[host_start..];

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port),
        None => (authority, DEFAULT_PORT),
    };

    Url {
        host: host.to_string(),
        port: port.to_string(),
        path: path.to_string(),
    }
}
