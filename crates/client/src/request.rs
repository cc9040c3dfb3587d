//! Structured description of an intercepted request.

use std::fmt;

use reqwest::Method;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use shellcache_core::cache::hash::compute_cache_key;
use url::Url;

/// The host-declared purpose of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Destination {
    /// A full navigable page load.
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    /// No destination was declared (plain `fetch()` calls).
    #[default]
    Empty,
    Other(String),
}

impl Destination {
    pub fn as_str(&self) -> &str {
        match self {
            Destination::Document => "document",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
            Destination::Other(other) => other,
        }
    }
}

impl From<&str> for Destination {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "image" => Destination::Image,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            "" => Destination::Empty,
            other => Destination::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request as seen by the controller.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, destination: Destination::Empty, headers: HeaderMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_accept(self, accept: HeaderValue) -> Self {
        self.with_header(header::ACCEPT, accept)
    }

    /// Header value as text. Lookup is case-insensitive; non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Key of this request inside a bucket.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::from("document"), Destination::Document);
        assert_eq!(Destination::from("SCRIPT"), Destination::Script);
        assert_eq!(Destination::from(""), Destination::Empty);
        assert_eq!(Destination::from("audio"), Destination::Other("audio".into()));
        assert_eq!(Destination::from("audio").to_string(), "audio");
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let request = RequestDescriptor::get(Url::parse("https://school.example/").unwrap())
            .with_accept(HeaderValue::from_static("text/html"));
        assert_eq!(request.header("Accept"), Some("text/html"));
        assert_eq!(request.header("accept"), Some("text/html"));
        assert_eq!(request.header("x-missing"), None);
    }

    #[test]
    fn test_cache_key_depends_on_method() {
        let url = Url::parse("https://school.example/app.js").unwrap();
        let get = RequestDescriptor::get(url.clone());
        let post = RequestDescriptor::new(Method::POST, url);
        assert_ne!(get.cache_key(), post.cache_key());
        assert_eq!(get.cache_key(), compute_cache_key("GET", "https://school.example/app.js"));
    }
}
