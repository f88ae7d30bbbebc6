//! Target extraction from the raw request target.
//!
//! The caller embeds an absolute URL in the request path:
//! `GET /https://github.com/owner/repo/blob/main/README.md`. Routers and
//! intermediaries that collapse repeated slashes turn the embedded `https://`
//! into `https:/`, so extraction works on the untouched request target and
//! repairs that damage before anything is parsed.

use std::borrow::Cow;

use {tracing::debug, url::Url};

use crate::{Error, Result};

const SCHEMES: [&str; 2] = ["https", "http"];

/// Recover the upstream URL string from a raw request target
/// (path plus query, leading `/` included).
///
/// Returns [`Error::NoTarget`] when nothing follows the leading separator
/// and [`Error::MalformedTarget`] when no `http://`/`https://` URL can be
/// recovered. Never touches the network.
pub fn extract_target(raw: &str) -> Result<String> {
    let stripped = raw.strip_prefix('/').unwrap_or(raw);
    if stripped.is_empty() {
        return Err(Error::NoTarget);
    }

    let mut target = match urlencoding::decode(stripped) {
        Ok(Cow::Owned(decoded)) => {
            debug!(from = %stripped, to = %decoded, "percent-decoded target");
            decoded
        },
        Ok(Cow::Borrowed(unchanged)) => unchanged.to_string(),
        // Decoding is best-effort: keep the undecoded string.
        Err(_) => stripped.to_string(),
    };

    if let Some(fixed) = repair_collapsed_prefix(&target) {
        debug!(target = %fixed, "repaired collapsed scheme separator");
        target = fixed;
    }

    if let Some(fixed) = repair_single_separator(&target) {
        debug!(target = %fixed, "repaired protocol separator");
        target = fixed;
    }

    if !has_http_prefix(&target) {
        return Err(Error::MalformedTarget(target));
    }
    Ok(target)
}

/// Parse an extracted target into a URL, enforcing an http(s) scheme.
pub fn parse_target(target: &str) -> Result<Url> {
    let url = Url::parse(target)?;
    if !SCHEMES.contains(&url.scheme()) {
        return Err(Error::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}

/// `https:/host/...` -> `https://host/...` (and the same for `http`).
fn repair_collapsed_prefix(target: &str) -> Option<String> {
    SCHEMES.iter().find_map(|scheme| {
        let rest = target.strip_prefix(scheme)?.strip_prefix(":/")?;
        if rest.starts_with('/') {
            None
        } else {
            Some(format!("{scheme}://{rest}"))
        }
    })
}

/// A single `:/` with no `://` anywhere, preceded by exactly `http` or `https`.
fn repair_single_separator(target: &str) -> Option<String> {
    if target.contains("://") {
        return None;
    }
    let mut parts = target.split(":/");
    let (scheme, rest) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !SCHEMES.contains(&scheme) {
        return None;
    }
    Some(format!("{scheme}://{rest}"))
}

fn has_http_prefix(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(
        "/https://github.com/user/repo/blob/main/file.txt",
        "https://github.com/user/repo/blob/main/file.txt"
    )]
    #[case(
        "/https:/forge-a.example/user/repo/blob/main/file.txt",
        "https://forge-a.example/user/repo/blob/main/file.txt"
    )]
    #[case("/http:/gitlab.com/group/project", "http://gitlab.com/group/project")]
    #[case(
        "/https%3A%2F%2Fhuggingface.co%2Forg%2Fmodel%2Fresolve%2Fmain%2Fconfig.json",
        "https://huggingface.co/org/model/resolve/main/config.json"
    )]
    #[case(
        "/https%3A%2Fgithub.com%2Fuser%2Frepo",
        "https://github.com/user/repo"
    )]
    #[case(
        "/https://github.com/user/repo/info/refs?service=git-upload-pack",
        "https://github.com/user/repo/info/refs?service=git-upload-pack"
    )]
    fn extracts_and_repairs(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(extract_target(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("/")]
    #[case("")]
    fn empty_path_is_no_target(#[case] raw: &str) {
        assert!(matches!(extract_target(raw), Err(Error::NoTarget)));
    }

    #[rstest]
    #[case("/github.com/user/repo")]
    #[case("/ftp://example.com/file")]
    #[case("/HTTPS://github.com/user/repo")]
    #[case("/favicon.ico")]
    #[case("/https:github.com")]
    fn rejects_non_http_targets(#[case] raw: &str) {
        assert!(
            matches!(extract_target(raw), Err(Error::MalformedTarget(_))),
            "{raw}"
        );
    }

    #[test]
    fn invalid_utf8_escape_keeps_original() {
        // %FF is not valid UTF-8 on its own; decoding fails and the raw text survives.
        let out = extract_target("/https://github.com/user/repo/blob/main/%FF.bin").unwrap();
        assert_eq!(out, "https://github.com/user/repo/blob/main/%FF.bin");
    }

    #[test]
    fn only_one_leading_separator_is_stripped() {
        assert!(matches!(
            extract_target("//https://github.com/user/repo"),
            Err(Error::MalformedTarget(_))
        ));
    }

    #[test]
    fn repairs_are_idempotent() {
        let once = extract_target("/https:/github.com/a/b").unwrap();
        let twice = extract_target(&format!("/{once}")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn collapsed_prefix_leaves_intact_urls_alone() {
        assert_eq!(repair_collapsed_prefix("https://github.com"), None);
        assert_eq!(
            repair_collapsed_prefix("https:/github.com").as_deref(),
            Some("https://github.com")
        );
    }

    #[rstest]
    #[case("https:/host/path", Some("https://host/path"))]
    #[case("http:/host", Some("http://host"))]
    #[case("ftp:/host", None)]
    #[case("https:/host/a:/b", None)]
    #[case("https://host", None)]
    fn single_separator_repair(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(repair_single_separator(input).as_deref(), expected);
    }

    #[test]
    fn extracted_targets_always_have_http_prefix() {
        let inputs = [
            "/https:/a.example/x",
            "/http:/a.example",
            "/https%3A%2F%2Fa.example",
            "/https://a.example/x?y=z",
            "/http%3A/a.example/%20x",
        ];
        for raw in inputs {
            let out = extract_target(raw).unwrap();
            assert!(has_http_prefix(&out), "{raw} -> {out}");
        }
    }

    #[test]
    fn parse_target_accepts_http_and_https() {
        assert_eq!(parse_target("https://github.com/a").unwrap().scheme(), "https");
        assert_eq!(parse_target("http://github.com/a").unwrap().scheme(), "http");
    }

    #[test]
    fn parse_target_rejects_missing_host() {
        assert!(matches!(parse_target("https://"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn parse_target_rejects_other_schemes() {
        assert!(matches!(
            parse_target("file:///etc/passwd"),
            Err(Error::UnsupportedScheme(_))
        ));
    }
}
