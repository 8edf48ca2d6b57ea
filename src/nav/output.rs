//! Destination for inline rendered links

pub trait OutputSink {
    /// Append a raw HTML fragment to the page
    fn output(&mut self, fragment: &str);
}

impl OutputSink for String {
    fn output(&mut self, fragment: &str) {
        self.push_str(fragment);
    }
}

impl OutputSink for Vec<String> {
    fn output(&mut self, fragment: &str) {
        self.push(fragment.to_string());
    }
}

/// Anchor markup for a link inside body text.
///
/// Neither argument is escaped; callers pass markup-safe text and URLs.
pub fn anchor(text: &str, url: &str) -> String {
    format!("<a href='?{}'>{}</a>", url, text)
}
