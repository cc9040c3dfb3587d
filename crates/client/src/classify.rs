//! Request classification.
//!
//! Every request lands in exactly one category, checked in this order:
//!
//! 1. **Document**: destination is `document`, or the Accept header asks for
//!    the configured document media type.
//! 2. **Api**: the target host is a backend host or one of its subdomains.
//! 3. **Asset**: everything else.

use serde::{Deserialize, Serialize};
use shellcache_core::AppConfig;

use crate::request::{Destination, RequestDescriptor};

/// Strategy bucket a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Document,
    Api,
    Asset,
}

/// Classification predicates built from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    backend_hosts: Vec<String>,
    document_accept: String,
}

impl Classifier {
    pub fn new<I, S>(backend_hosts: I, document_accept: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let backend_hosts = backend_hosts
            .into_iter()
            .map(|h| h.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { backend_hosts, document_accept: document_accept.trim().to_ascii_lowercase() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.backend_hosts, &config.document_accept)
    }

    /// True for full page loads.
    pub fn is_document(&self, request: &RequestDescriptor) -> bool {
        if request.destination == Destination::Document {
            return true;
        }
        if self.document_accept.is_empty() {
            return false;
        }
        request
            .header("accept")
            .is_some_and(|accept| accept.to_ascii_lowercase().contains(&self.document_accept))
    }

    /// True when the request targets the live backend.
    pub fn is_backend(&self, request: &RequestDescriptor) -> bool {
        let Some(host) = request.url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.backend_hosts
            .iter()
            .any(|backend| host == *backend || host.strip_suffix(backend.as_str()).is_some_and(|p| p.ends_with('.')))
    }

    pub fn classify(&self, request: &RequestDescriptor) -> Category {
        if self.is_document(request) {
            Category::Document
        } else if self.is_backend(request) {
            Category::Api
        } else {
            Category::Asset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use url::Url;

    fn classifier() -> Classifier {
        Classifier::new(["script.google.com", "googleapis.com"], "text/html")
    }

    fn request(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_document_by_destination() {
        let req = request("https://school.example/app/page.html").with_destination(Destination::Document);
        assert_eq!(classifier().classify(&req), Category::Document);
    }

    #[test]
    fn test_document_by_accept_header() {
        let req = request("https://school.example/app/page.html")
            .with_accept(HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9"));
        assert_eq!(classifier().classify(&req), Category::Document);
    }

    #[test]
    fn test_document_wins_over_backend_host() {
        let req = request("https://script.google.com/macros/s/abc/exec").with_destination(Destination::Document);
        assert_eq!(classifier().classify(&req), Category::Document);
    }

    #[test]
    fn test_api_by_host() {
        let req = request("https://script.google.com/macros/s/abc/exec?action=getModules");
        assert_eq!(classifier().classify(&req), Category::Api);
    }

    #[test]
    fn test_api_by_subdomain() {
        let req = request("https://sheets.googleapis.com/v4/spreadsheets");
        assert_eq!(classifier().classify(&req), Category::Api);
    }

    #[test]
    fn test_lookalike_host_is_not_api() {
        let req = request("https://evilgoogleapis.com/x.js");
        assert_eq!(classifier().classify(&req), Category::Asset);
    }

    #[test]
    fn test_asset_default() {
        let req = request("https://school.example/app/script.js").with_destination(Destination::Script);
        assert_eq!(classifier().classify(&req), Category::Asset);
    }

    #[test]
    fn test_classification_is_total() {
        let c = classifier();
        let urls = [
            "https://school.example/",
            "https://script.google.com/x",
            "http://localhost:8080/style.css",
            "https://fonts.googleapis.com/css",
        ];
        let destinations = [Destination::Document, Destination::Style, Destination::Empty, Destination::Other("x".into())];
        for url in urls {
            for dest in &destinations {
                let req = request(url).with_destination(dest.clone());
                let expected = if c.is_document(&req) {
                    Category::Document
                } else if c.is_backend(&req) {
                    Category::Api
                } else {
                    Category::Asset
                };
                assert_eq!(c.classify(&req), expected);
            }
        }
    }

    #[test]
    fn test_from_config_normalizes_hosts() {
        let config = AppConfig { backend_hosts: vec![" .API.Example.com ".into(), String::new()], ..Default::default() };
        let c = Classifier::from_config(&config);
        assert_eq!(c.classify(&request("https://api.example.com/rows")), Category::Api);
        assert_eq!(c.classify(&request("https://v2.api.example.com/rows")), Category::Api);
    }
}
