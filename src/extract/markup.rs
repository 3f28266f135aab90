//! Tag-delimited substring cursor
//!
//! Listing pages are scanned by searching for literal markers, never parsed into a
//! tree. A [`Markup`] is a window into the page that only ever shrinks.

/// A window into page markup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markup<'a> {
    content: &'a str,
}

impl<'a> Markup<'a> {
    pub fn new(content: &'a str) -> Self {
        Self { content }
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn content(&self) -> &'a str {
        self.content
    }

    /// Moves the window past the first occurrence of `marker`
    ///
    /// The window becomes empty when the marker is absent.
    pub fn skip_past(&mut self, marker: &str) {
        self.content = match self.content.find(marker) {
            Some(pos) => &self.content[pos + marker.len()..],
            None => "",
        };
    }

    /// Cuts the window at the first occurrence of `marker`
    ///
    /// The window becomes empty when the marker is absent.
    pub fn truncate_at(&mut self, marker: &str) {
        self.content = match self.content.find(marker) {
            Some(pos) => &self.content[..pos],
            None => "",
        };
    }

    /// Window after `marker`; see [`Markup::skip_past`]
    pub fn after(mut self, marker: &str) -> Self {
        self.skip_past(marker);
        self
    }

    /// Window before `marker`; see [`Markup::truncate_at`]
    pub fn before(mut self, marker: &str) -> Self {
        self.truncate_at(marker);
        self
    }

    /// Window up to the next `marker`, or the whole window if there is none
    pub fn section(self, marker: &str) -> Self {
        match self.content.find(marker) {
            Some(pos) => Self::new(&self.content[..pos]),
            None => self,
        }
    }

    /// Quoted value following the first occurrence of `name`
    ///
    /// Returns an empty string when the attribute or its opening quote is missing.
    /// An unterminated value runs to the end of the window.
    pub fn attribute(&self, name: &str) -> &'a str {
        let Some(pos) = self.content.find(name) else {
            return "";
        };
        let rest = &self.content[pos + name.len()..];

        let Some(open) = rest.find('"') else {
            return "";
        };
        let value = &rest[open + 1..];

        match value.find('"') {
            Some(close) => &value[..close],
            None => value,
        }
    }
}

/// Replaces the character references that show up in listing titles
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
