//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests against one base URL. All requests share
//! a single cookie jar, so a login performed through this client carries over
//! to later page fetches. No retries: a failed call is returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ProbeConfig;
use crate::types::{QaError, QaResult};

const USER_AGENT: &str = concat!("steelqa/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed by the page client.
const MAX_REDIRECTS: usize = 10;

/// A fully read HTTP response.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    /// Requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// All response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl PageResponse {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// HTTP client bound to the target application's base URL.
#[derive(Clone)]
pub struct HttpClient {
    base_url: Url,
    client: reqwest::Client,
    /// Same jar, never follows redirects. Used to observe form posts.
    no_redirect: reqwest::Client,
    jar: Arc<Jar>,
}

impl HttpClient {
    /// Create a client with a fresh session jar.
    pub fn new(config: &ProbeConfig) -> QaResult<Self> {
        Self::with_timeout(config.base_url.clone(), config.timeout)
    }

    pub fn with_timeout(base_url: Url, timeout: Duration) -> QaResult<Self> {
        let jar = Arc::new(Jar::default());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .cookie_provider(jar.clone())
            .user_agent(USER_AGENT)
            .build()?;

        let no_redirect = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .cookie_provider(jar.clone())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url,
            client,
            no_redirect,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path or absolute URL against the base URL.
    pub fn resolve(&self, target: &str) -> QaResult<Url> {
        self.base_url
            .join(target)
            .map_err(|e| QaError::InvalidUrl(format!("{target}: {e}")))
    }

    /// GET `target`, following redirects. Any status is returned as-is.
    pub async fn get(&self, target: &str) -> QaResult<PageResponse> {
        let url = self.resolve(target)?;
        debug!(%url, "GET");
        let resp = self.client.get(url.clone()).send().await?;
        read_response(url, resp).await
    }

    /// GET `target` and treat any non-2xx status as an error.
    pub async fn get_ok(&self, target: &str) -> QaResult<PageResponse> {
        let page = self.get(target).await?;
        if !page.is_success() {
            return Err(QaError::Status {
                status: page.status,
                url: page.final_url,
            });
        }
        Ok(page)
    }

    /// POST url-encoded form data without following redirects.
    ///
    /// All response headers are kept so callers can inspect `location`
    /// and `set-cookie`.
    pub async fn post_form(
        &self,
        target: &str,
        form_fields: &[(String, String)],
        extra_headers: &[(String, String)],
    ) -> QaResult<PageResponse> {
        let url = self.resolve(target)?;
        debug!(%url, fields = form_fields.len(), "POST");

        let mut builder = self.no_redirect.post(url.clone());
        for (name, value) in extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let resp = builder.form(form_fields).send().await?;
        read_response(url, resp).await
    }

    /// Cookies the jar would send to the base URL, in header order.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|v| v.to_str().ok().map(parse_cookie_header))
            .unwrap_or_default()
    }
}

async fn read_response(url: Url, resp: reqwest::Response) -> QaResult<PageResponse> {
    let status = resp.status().as_u16();
    let final_url = resp.url().to_string();
    let headers = resp
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();
    let body = resp.text().await?;
    debug!(status, bytes = body.len(), %final_url, "response");

    Ok(PageResponse {
        url: url.to_string(),
        final_url,
        status,
        headers,
        body,
    })
}

/// Split a `Cookie` header value into name/value pairs.
fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, headers: &[(&str, &str)]) -> PageResponse {
        PageResponse {
            url: "http://localhost:8080/".to_string(),
            final_url: "http://localhost:8080/".to_string(),
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: String::new(),
        }
    }

    #[test]
    fn test_client_creation() {
        let config = ProbeConfig::new("http://localhost:8080").unwrap();
        let client = HttpClient::new(&config).unwrap();
        assert!(client.cookies().is_empty());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let config = ProbeConfig::new("http://localhost:8080").unwrap();
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(
            client.resolve("/Account/Login").unwrap().as_str(),
            "http://localhost:8080/Account/Login"
        );
        assert_eq!(
            client.resolve("http://other:9000/x").unwrap().as_str(),
            "http://other:9000/x"
        );
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let resp = response(302, &[("location", "/dashboard")]);
        assert!(resp.is_redirect());
        assert!(!resp.is_success());
        assert_eq!(resp.header("Location"), Some("/dashboard"));
        assert_eq!(resp.location(), Some("/dashboard"));
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("a=1; .AspNetCore.Identity.Application=xyz==; flag");
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "1".to_string()),
                (
                    ".AspNetCore.Identity.Application".to_string(),
                    "xyz==".to_string()
                ),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
