//! Validation and sanitization helpers shared by the fetch path.
//!
//! Every URL is checked against the allow-list before it is dereferenced,
//! and every filename derived from user input goes through the sanitizer
//! before it touches the filesystem.

use reqwest::Url;

use crate::constants::MAX_FILENAME_LEN;
use crate::error::PipelineError;

/// Gate applied to the query URL and to every discovered tile URL.
///
/// The scheme must be http or https and the host must be an allow-listed
/// domain or one of its subdomains. The check runs against the parsed
/// host, never against a substring of the full URL, so a hostile path
/// component cannot smuggle an allowed name past it.
pub fn validate_url(raw: &str, allowed_domains: &[String]) -> Result<Url, PipelineError> {
    let url = Url::parse(raw)
        .map_err(|err| PipelineError::Validation(format!("malformed URL '{raw}': {err}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PipelineError::Validation(format!(
                "scheme '{other}' is not permitted"
            )));
        }
    }
    let host = url
        .host_str()
        .ok_or_else(|| PipelineError::Validation(format!("URL '{raw}' has no host")))?;
    let permitted = allowed_domains
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));
    if !permitted {
        return Err(PipelineError::Validation(format!(
            "host '{host}' is not on the allow-list"
        )));
    }
    Ok(url)
}

/// Strips path separators and shell-special characters, collapses `..`
/// sequences, and truncates to a bounded length.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => ch,
        })
        .collect();
    // '_' never reintroduces a dot, so one pass is enough
    let cleaned = cleaned.replace("..", "_");
    cleaned.chars().take(MAX_FILENAME_LEN).collect()
}
