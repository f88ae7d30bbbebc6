//! Accelerated-link generation for the `/api/generate` endpoint.
//!
//! Given a platform URL, produce the proxied browser link and ready-to-paste
//! `wget`, `curl` and `git clone` commands. Validation is stricter than the
//! forwarding path: links are only generated for URL shapes that will
//! actually download something.

use {
    serde::{Deserialize, Serialize},
    url::Url,
};

use crate::{
    Error, Result,
    guard::{DomainGuard, authority},
    rewrite::{GITHUB_HOST, GITLAB_HOST, HUGGINGFACE_HOST, PlatformRules},
};

const GIT_UNSUPPORTED_PLATFORM: &str = "git clone is not supported for this link (GitHub/GitLab repositories only)";
const GIT_UNSUPPORTED_ARTIFACT: &str =
    "git clone is not supported for this link (use the browser link or a download command for archives, releases and raw files)";
const GIT_UNSUPPORTED_SHAPE: &str = "git clone is not supported for this link (no owner/repository in path)";

/// Path fragments that name a downloadable artifact rather than a repository.
const NON_CLONEABLE: &[&str] = &[
    "/archive/",
    "/releases/",
    "/tarball/",
    "/zipball/",
    "/raw/",
    "/-/raw/",
    "/gist/",
];

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateLinksRequest {
    pub original_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateLinksResponse {
    pub success: bool,
    pub browser_link: String,
    pub wget_command: String,
    pub curl_command: String,
    pub git_command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateLinksResponse {
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl From<GeneratedLinks> for GenerateLinksResponse {
    fn from(links: GeneratedLinks) -> Self {
        Self {
            success: true,
            browser_link: links.browser_link,
            wget_command: links.wget_command,
            curl_command: links.curl_command,
            git_command: links.git_command,
            error: None,
        }
    }
}

/// The generated link set for one original URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLinks {
    pub browser_link: String,
    pub wget_command: String,
    pub curl_command: String,
    pub git_command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    GitHub,
    GitLab,
    HuggingFace,
    Other,
}

impl Platform {
    fn of(url: &Url) -> Self {
        match url.host_str() {
            Some(GITHUB_HOST) => Self::GitHub,
            Some(GITLAB_HOST) => Self::GitLab,
            Some(HUGGINGFACE_HOST) => Self::HuggingFace,
            _ => Self::Other,
        }
    }

    fn is_forge(self) -> bool {
        matches!(self, Self::GitHub | Self::GitLab)
    }
}

/// Build the link set for `original_url`, proxied through `base_url`
/// (e.g. `http://proxy.local:8080`, no trailing slash).
pub fn generate_links(
    base_url: &str,
    original_url: &str,
    rules: &PlatformRules,
    guard: &DomainGuard,
) -> Result<GeneratedLinks> {
    let original = original_url.trim();
    if original.is_empty() {
        return Err(Error::invalid_link("original URL must not be empty"));
    }
    if !original.starts_with("http://") && !original.starts_with("https://") {
        return Err(Error::invalid_link(
            "enter a full URL including http:// or https://",
        ));
    }

    let url = Url::parse(original).map_err(|e| Error::invalid_link(format!("invalid URL: {e}")))?;
    let upstream = rules.rewrite(url.clone());
    if guard.check_url(&upstream).is_err() {
        let host = authority(&upstream).unwrap_or_default();
        return Err(Error::invalid_link(format!("unsupported domain: {host}")));
    }

    let platform = Platform::of(&url);
    validate_shape(platform, url.path())?;

    let base = base_url.trim_end_matches('/');
    let browser_link = format!("{base}/{original}");
    Ok(GeneratedLinks {
        wget_command: format!("wget \"{browser_link}\""),
        curl_command: format!("curl -L \"{browser_link}\""),
        git_command: git_command(base, platform, &url),
        browser_link,
    })
}

fn validate_shape(platform: Platform, path: &str) -> Result<()> {
    match platform {
        Platform::HuggingFace => {
            if path.contains("/resolve/") || path.contains("/blob/") {
                Ok(())
            } else {
                Err(Error::invalid_link(
                    "Hugging Face links must name a file (/blob/ or /resolve/)",
                ))
            }
        },
        Platform::GitHub => {
            let ok = is_repo_root(path)
                || ["/blob/", "/raw/", "/tree/", "/gist/"]
                    .iter()
                    .any(|p| path.contains(p));
            if ok {
                Ok(())
            } else {
                Err(Error::invalid_link(
                    "GitHub links must be a repository root (for git clone) or a file path (/blob/, /raw/, /tree/)",
                ))
            }
        },
        Platform::GitLab => {
            let ok = is_repo_root(path)
                || ["/-/blob/", "/-/raw/", "/-/tree/"]
                    .iter()
                    .any(|p| path.contains(p));
            if ok {
                Ok(())
            } else {
                Err(Error::invalid_link(
                    "GitLab links must be a repository root (for git clone) or a file path (/-/blob/, /-/raw/, /-/tree/)",
                ))
            }
        },
        Platform::Other => Ok(()),
    }
}

/// `/owner/repo` or `/owner/repo/`, with no `.` anywhere in the path.
fn is_repo_root(path: &str) -> bool {
    let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
    parts.len() == 2 && parts.iter().all(|p| !p.is_empty()) && !path.contains('.')
}

fn git_command(base: &str, platform: Platform, url: &Url) -> String {
    if !platform.is_forge() {
        return GIT_UNSUPPORTED_PLATFORM.to_string();
    }
    let path = url.path();
    if NON_CLONEABLE.iter().any(|p| path.contains(p)) {
        return GIT_UNSUPPORTED_ARTIFACT.to_string();
    }

    let repo_path = ["/blob/", "/tree/"]
        .iter()
        .fold(path, |p, marker| p.split(marker).next().unwrap_or(p));
    let mut segments = repo_path.split('/').filter(|s| !s.is_empty());
    let (Some(owner), Some(repo)) = (segments.next(), segments.next()) else {
        return GIT_UNSUPPORTED_SHAPE.to_string();
    };
    // GitLab browse paths carry a `-` separator before blob/tree.
    if repo == "-" {
        return GIT_UNSUPPORTED_SHAPE.to_string();
    }

    let host = authority(url).unwrap_or_default();
    let suffix = if repo.ends_with(".git") { "" } else { ".git" };
    format!(
        "git clone {base}/{}://{host}/{owner}/{repo}{suffix}",
        url.scheme()
    )
}
