//! Path-safety check for link targets
//!
//! Link URLs are query strings (`page=town/market&op=buy`). The `page`
//! parameter names a page inside the page namespace; anything that could
//! resolve outside of it is refused before the link is offered.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Query parameter that selects the page
pub const PAGE_PARAM: &str = "page";

/// Decides whether a link target stays inside the permitted page namespace
pub trait PathValidator: Send + Sync {
    fn validate(&self, url: &str) -> bool;
}

/// Default validator: syntactic checks on the `page` parameter and, when a
/// root directory is configured, existence of the page file under it.
#[derive(Debug, Clone)]
pub struct PageNamespace {
    root: Option<PathBuf>,
    extension: String,
}

impl Default for PageNamespace {
    fn default() -> Self {
        Self {
            root: None,
            extension: "html".to_string(),
        }
    }
}

impl PageNamespace {
    /// Syntactic checks only
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require `{root}/{page}.{extension}` to exist
    pub fn rooted(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: Some(root.into()),
            extension: extension.into(),
        }
    }

    /// The single `page` value of `url`. A repeated `page` key is refused:
    /// hosts disagree on which duplicate wins.
    fn page_of(url: &str) -> Option<String> {
        let params: Vec<(String, String)> = serde_urlencoded::from_str(url).ok()?;
        let mut pages = params
            .into_iter()
            .filter(|(key, _)| key == PAGE_PARAM)
            .map(|(_, value)| value);

        let page = pages.next()?;
        if pages.next().is_some() {
            debug!(url, "Repeated page parameter in link target");
            return None;
        }
        Some(page)
    }

    fn is_safe_page(page: &str) -> bool {
        !page.is_empty()
            && !page.starts_with('/')
            && !page.ends_with('/')
            && page.split('/').all(|segment| {
                !segment.is_empty()
                    && segment != "."
                    && segment != ".."
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            })
    }

    fn resolves_inside(root: &Path, page: &str, extension: &str) -> bool {
        let candidate = root.join(format!("{}.{}", page, extension));
        match (root.canonicalize(), candidate.canonicalize()) {
            (Ok(root), Ok(file)) => file.starts_with(&root) && file.is_file(),
            _ => false,
        }
    }
}

impl PathValidator for PageNamespace {
    fn validate(&self, url: &str) -> bool {
        let Some(page) = Self::page_of(url) else {
            debug!(url, "No usable page parameter in link target");
            return false;
        };

        if !Self::is_safe_page(&page) {
            debug!(url, page = %page, "Unsafe page path");
            return false;
        }

        match &self.root {
            Some(root) => Self::resolves_inside(root, &page, &self.extension),
            None => true,
        }
    }
}

/// Accepts every URL. For hosts that validate targets elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPaths;

impl PathValidator for AllowAllPaths {
    fn validate(&self, _url: &str) -> bool {
        true
    }
}
