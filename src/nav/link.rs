//! Link values
//!
//! [`Link`] is what a page handler offers; [`LinkRecord`] is what the
//! registry keeps and the actor snapshot stores. Restrictions are checked on
//! the way in and are not part of the record.

use serde::{Deserialize, Serialize};

use crate::auth::Restriction;
use crate::types::{NavError, Result};

/// Container links land in when none is given
pub const DEFAULT_CONTAINER: &str = "main";

fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

/// One navigable destination offered by a page
#[derive(Debug, Clone)]
pub struct Link {
    display_name: Option<String>,
    url: Option<String>,
    container: String,
    description: Option<String>,
    position: i32,
    restriction: Option<Restriction>,
}

impl Link {
    /// Create a link. At least one of `display_name` and `url` is required.
    pub fn new(display_name: Option<&str>, url: Option<&str>) -> Result<Self> {
        if display_name.is_none() && url.is_none() {
            return Err(NavError::EmptyLink);
        }

        Ok(Self {
            display_name: display_name.map(str::to_string),
            url: url.map(str::to_string),
            container: default_container(),
            description: None,
            position: 0,
            restriction: None,
        })
    }

    /// Visible link with a target
    pub fn named(display_name: &str, url: &str) -> Self {
        Self::from_parts(Some(display_name), Some(url))
    }

    /// Section header, no target
    pub fn head(title: &str) -> Self {
        Self::from_parts(Some(title), None)
    }

    /// Target that is never shown in a menu (form actions, inline text links)
    pub fn hidden(url: &str) -> Self {
        Self::from_parts(None, Some(url))
    }

    fn from_parts(display_name: Option<&str>, url: Option<&str>) -> Self {
        Self {
            display_name: display_name.map(str::to_string),
            url: url.map(str::to_string),
            container: default_container(),
            description: None,
            position: 0,
            restriction: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn with_restriction(mut self, restriction: Option<Restriction>) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    /// The registry entry for this link
    pub fn to_record(&self) -> LinkRecord {
        LinkRecord {
            display_name: self.display_name.clone(),
            url: self.url.clone(),
            container: self.container.clone(),
            position: self.position,
            description: self.description.clone(),
        }
    }
}

/// Link as stored in the registry and in actor snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub display_name: Option<String>,
    pub url: Option<String>,
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub description: Option<String>,
}

impl LinkRecord {
    pub fn new(display_name: Option<&str>, url: Option<&str>) -> Self {
        Link::from_parts(display_name, url).to_record()
    }

    /// Lookup rule shared by duplicate suppression and request checks: when
    /// both keys are given both must match, otherwise the one given must.
    /// With no key at all nothing matches.
    pub fn matches(&self, display_name: Option<&str>, url: Option<&str>) -> bool {
        match (display_name, url) {
            (Some(name), Some(url)) => {
                self.display_name.as_deref() == Some(name) && self.url.as_deref() == Some(url)
            }
            (Some(name), None) => self.display_name.as_deref() == Some(name),
            (None, Some(url)) => self.url.as_deref() == Some(url),
            (None, None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_link_rejected() {
        assert!(matches!(Link::new(None, None), Err(NavError::EmptyLink)));
        assert!(Link::new(Some("Title"), None).is_ok());
        assert!(Link::new(None, Some("page=form")).is_ok());
    }

    #[test]
    fn test_defaults() {
        let link = Link::named("Home", "page=home");
        assert_eq!(link.container(), DEFAULT_CONTAINER);
        assert_eq!(link.position(), 0);
        assert!(link.description().is_none());
        assert!(link.restriction().is_none());
    }

    #[test]
    fn test_record_drops_restriction_keeps_fields() {
        let link = Link::named("Shop", "page=shop")
            .with_container("town")
            .with_description("Buy things")
            .with_position(3)
            .with_restriction(Some(Restriction::group("players")));

        let record = link.to_record();
        assert_eq!(record.display_name.as_deref(), Some("Shop"));
        assert_eq!(record.url.as_deref(), Some("page=shop"));
        assert_eq!(record.container, "town");
        assert_eq!(record.position, 3);
        assert_eq!(record.description.as_deref(), Some("Buy things"));
    }

    #[test]
    fn test_matching_rule() {
        let record = LinkRecord::new(Some("Home"), Some("page=home"));

        assert!(record.matches(Some("Home"), Some("page=home")));
        assert!(!record.matches(Some("Home"), Some("page=other")));
        assert!(record.matches(Some("Home"), None));
        assert!(record.matches(None, Some("page=home")));
        assert!(!record.matches(None, Some("page=other")));
        assert!(!record.matches(None, None));
    }

    #[test]
    fn test_header_matches_by_name_only() {
        let head = LinkRecord::new(Some("Travel"), None);
        assert!(head.matches(Some("Travel"), None));
        assert!(!head.matches(Some("Travel"), Some("page=travel")));
    }

    #[test]
    fn test_record_deserialize_defaults() {
        let record: LinkRecord =
            serde_json::from_str(r#"{"display_name": null, "url": "page=form"}"#).unwrap();
        assert_eq!(record.container, DEFAULT_CONTAINER);
        assert_eq!(record.position, 0);
        assert!(record.display_name.is_none());
    }
}
