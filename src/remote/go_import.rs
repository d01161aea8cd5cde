use anyhow::Result;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::sync::LazyLock;
use url::Url;

use crate::vcs::Vcs;

static GO_IMPORT_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\s+name\s*=\s*["']go-import["']\s+content\s*=\s*["']([^"']+)["']"#)
        .unwrap()
});

/// One `<meta name="go-import" content="prefix vcs repo-root">` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoImport {
    pub prefix: String,
    pub vcs: String,
    pub repo_root: String,
}

pub fn http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("grab/", env!("CARGO_PKG_VERSION"))),
    );
    let client = Client::builder().default_headers(headers).build()?;
    Ok(client)
}

/// Ask `url`'s host where the repository for `url` is actually served.
///
/// Fetches `<url>?go-get=1` and picks the go-import entry with the longest
/// prefix covering `host/path`. Returns `Ok(None)` when the page has no
/// matching entry or names a VCS we don't support.
pub fn lookup(client: &Client, url: &Url) -> Result<Option<(Vcs, Url)>> {
    let mut page = url.clone();
    page.set_query(Some("go-get=1"));
    let body = client.get(page.as_str()).send()?.error_for_status()?.text()?;

    let import_path = import_path(url);
    let best = parse_meta(&body)
        .into_iter()
        .filter(|m| {
            import_path == m.prefix || import_path.starts_with(&format!("{}/", m.prefix))
        })
        .max_by_key(|m| m.prefix.len());

    let Some(found) = best else {
        return Ok(None);
    };
    let Some(vcs) = Vcs::from_name(&found.vcs) else {
        log::debug!("go-import for {} names unsupported vcs {:?}", url, found.vcs);
        return Ok(None);
    };
    Ok(Some((vcs, Url::parse(&found.repo_root)?)))
}

pub fn parse_meta(body: &str) -> Vec<GoImport> {
    GO_IMPORT_META
        .captures_iter(body)
        .filter_map(|caps| {
            let mut fields = caps[1].split_whitespace();
            let prefix = fields.next()?.trim_end_matches('/').to_string();
            let vcs = fields.next()?.to_string();
            let repo_root = fields.next()?.to_string();
            Some(GoImport {
                prefix,
                vcs,
                repo_root,
            })
        })
        .collect()
}

/// `host[:port]/path` without the trailing slash, as Go import paths are written.
fn import_path(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let path = url.path().trim_end_matches('/');
    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, path),
        None => format!("{}{}", host, path),
    }
}
