//! Read-only view of the inbound request

/// The parts of the current request the engine looks at
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Full request URI, e.g. `/index?page=home`
    pub request_uri: Option<String>,
    /// Path of the script serving the request
    pub script_path: Option<String>,
    /// `Referer` header
    pub referer: Option<String>,
}

impl RequestContext {
    pub fn new(request_uri: impl Into<String>) -> Self {
        Self {
            request_uri: Some(request_uri.into()),
            ..Self::default()
        }
    }

    pub fn with_script_path(mut self, script_path: impl Into<String>) -> Self {
        self.script_path = Some(script_path.into());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Query portion of the request URI. `None` unless the URI has a `?`.
    pub fn request_url(&self) -> Option<String> {
        let uri = self.request_uri.as_deref()?;
        let (_, query) = uri.split_once('?')?;
        let query = query.split_once('#').map_or(query, |(q, _)| q);
        Some(query.to_string())
    }

    /// Referer URL, only reported when the request was served by a script
    pub fn referer_url(&self) -> Option<String> {
        match self.script_path.as_deref() {
            Some(path) if !path.is_empty() => self.referer.clone(),
            _ => None,
        }
    }
}
