use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::error::GetError;

static HAS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").unwrap());

/// `[user@]host:path`, the form `git` accepts for ssh remotes.
static SCP_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:([^@/:]+)@)?([^:/]+):(/?[^/].*)$").unwrap());

/// `8080/...`: what follows `host:` is a port, not an scp path.
static PORT_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,5}(?:/|$)").unwrap());

/// A first path segment that reads like `example.com` or `example.com:8080`.
static LOOKS_LIKE_AUTHORITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]\.[A-Za-z]+(?::\d{1,5})?$").unwrap());

const DEFAULT_HOST: &str = "github.com";

/// Parse a repository reference into an absolute URL.
///
/// Accepted forms:
/// - `https://host/path`, `ssh://git@host/path`, any other `scheme://...`
/// - `git@host:owner/repo.git` (scp-like, becomes `ssh://`)
/// - `host.tld/owner/repo` (becomes `https://`)
/// - `owner/repo` (a repository on github.com)
/// - `repo` (owned by `user` on github.com)
pub fn parse_reference(arg: &str, user: Option<&str>) -> Result<Url, GetError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(GetError::parse(arg, "empty reference"));
    }

    let candidate = if HAS_SCHEME.is_match(arg) {
        arg.to_string()
    } else if let Some(caps) = SCP_LIKE
        .captures(arg)
        .filter(|c| !PORT_PREFIX.is_match(&c[3]))
    {
        let user = caps.get(1).map(|m| format!("{}@", m.as_str())).unwrap_or_default();
        let path = caps[3].trim_start_matches('/');
        format!("ssh://{}{}/{}", user, &caps[2], path)
    } else {
        shorthand(arg, user)?
    };

    let url = Url::parse(&candidate).map_err(|e| GetError::parse(arg, e.to_string()))?;
    match url.host_str() {
        Some(h) if !h.is_empty() => Ok(url),
        _ => Err(GetError::parse(arg, "missing host")),
    }
}

fn shorthand(arg: &str, user: Option<&str>) -> Result<String, GetError> {
    let trimmed = arg.trim_end_matches('/');
    let segs: Vec<&str> = trimmed.split('/').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(GetError::parse(arg, "empty path segment"));
    }
    if segs.iter().any(|s| *s == "." || *s == "..") {
        return Err(GetError::parse(arg, "relative path is not under any root"));
    }

    if LOOKS_LIKE_AUTHORITY.is_match(segs[0]) {
        return Ok(format!("https://{}", trimmed));
    }
    match segs.len() {
        1 => match user {
            Some(u) if !u.is_empty() => Ok(format!("https://{}/{}/{}", DEFAULT_HOST, u, trimmed)),
            _ => Err(GetError::parse(
                arg,
                "a bare repository name needs a configured user",
            )),
        },
        2 => Ok(format!("https://{}/{}", DEFAULT_HOST, trimmed)),
        _ => Ok(format!("https://{}", trimmed)),
    }
}

/// Rewrite an `http(s)` or `git` URL to `ssh://<user>@host/path`.
///
/// The user is taken from the URL when present, otherwise `git`. Any port is
/// dropped since it belonged to the original endpoint. `ssh` URLs pass
/// through. Subversion and other schemes have no ssh form here.
pub fn to_ssh(url: &Url) -> Result<Url, GetError> {
    let fail = |reason: String| GetError::SchemeConversion {
        url: url.to_string(),
        reason,
    };
    match url.scheme() {
        "ssh" => return Ok(url.clone()),
        "http" | "https" | "git" => {}
        other => return Err(fail(format!("unsupported scheme {:?}", other))),
    }
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| fail("missing host".to_string()))?;
    let user = match url.username() {
        "" => "git",
        u => u,
    };
    Url::parse(&format!("ssh://{}@{}{}", user, host, url.path())).map_err(|e| fail(e.to_string()))
}
