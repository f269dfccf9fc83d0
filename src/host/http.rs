use super::{PageHost, PageInfo};
use crate::cache::{HeaderCache, ResourceType, ResponseEvent};
use crate::checker::{evaluate_page, PageDocument};
use crate::config::Config;
use crate::error::HostError;
use crate::model::{Finding, HeaderEntry, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const HTML_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

struct LoadedPage {
    document: PageDocument,
    content_type: Option<String>,
}

/// Host that loads pages over HTTP(S).
///
/// Every navigation publishes the top-level response headers to the shared
/// [`HeaderCache`] and keeps the returned document for inspection.
pub struct HttpPageHost {
    client: reqwest::Client,
    cache: Arc<HeaderCache>,
    pages: RwLock<HashMap<SessionId, LoadedPage>>,
    next_session: AtomicU64,
}

impl HttpPageHost {
    pub fn new(cache: Arc<HeaderCache>) -> Self {
        Self::with_client(cache, reqwest::Client::new())
    }

    pub fn with_client(cache: Arc<HeaderCache>, client: reqwest::Client) -> Self {
        Self {
            client,
            cache,
            pages: RwLock::new(HashMap::new()),
            next_session: AtomicU64::new(1),
        }
    }

    /// Builds a host whose client uses the configured user agent and
    /// request timeout.
    pub fn from_config(cache: Arc<HeaderCache>, config: &Config) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(cache, client))
    }

    /// Opens `url` in a new session.
    pub async fn navigate(&self, url: &str) -> Result<SessionId, HostError> {
        let session = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        self.navigate_in(session, url).await?;
        Ok(session)
    }

    /// Loads `url` into an existing or new `session`, replacing whatever
    /// that session showed before.
    pub async fn navigate_in(&self, session: SessionId, url: &str) -> Result<(), HostError> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HostError::UnsupportedScheme(url.scheme().to_string()));
        }

        info!(%session, %url, "loading page");
        let response = self.client.get(url).send().await?;
        let final_url = response.url().clone();

        let headers: Vec<HeaderEntry> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                HeaderEntry::new(
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let content_type = headers
            .iter()
            .find(|h| h.is("content-type"))
            .map(|h| h.value.clone());
        let body = response.text().await?;
        debug!(%session, bytes = body.len(), status_url = %final_url, "page loaded");

        let document = PageDocument::new(final_url, body).with_cookie(document_cookie(&headers));

        // Snapshot and document are replaced together, only once the whole
        // response has arrived; a failed load leaves the previous pair intact.
        let mut pages = self
            .pages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.cache.observe(ResponseEvent {
            session,
            resource: ResourceType::MainFrame,
            headers,
        });
        pages.insert(
            session,
            LoadedPage {
                document,
                content_type,
            },
        );
        Ok(())
    }

    /// Forgets a session. Its header snapshot stays in the cache.
    pub fn close(&self, session: SessionId) -> bool {
        self.pages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&session)
            .is_some()
    }

    fn page<T>(
        &self,
        session: SessionId,
        f: impl FnOnce(&LoadedPage) -> T,
    ) -> Result<T, HostError> {
        let pages = self
            .pages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pages
            .get(&session)
            .map(f)
            .ok_or(HostError::SessionNotFound(session))
    }
}

#[async_trait]
impl PageHost for HttpPageHost {
    async fn resolve(&self, session: SessionId) -> Result<PageInfo, HostError> {
        self.page(session, |page| PageInfo {
            url: page.document.url.to_string(),
        })
    }

    async fn inspect(&self, session: SessionId) -> Result<Vec<Finding>, HostError> {
        let (document, content_type) =
            self.page(session, |page| (page.document.clone(), page.content_type.clone()))?;

        if !is_html(content_type.as_deref()) {
            return Err(HostError::denied(format!(
                "cannot inspect non-HTML document ({})",
                content_type.unwrap_or_default()
            )));
        }

        Ok(evaluate_page(&document))
    }
}

/// A missing content type is sniffed as HTML, as browsers do for documents.
fn is_html(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => {
            let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            HTML_TYPES.contains(&essence.as_str())
        }
    }
}

/// Builds what `document.cookie` would show after the given response:
/// the `name=value` pairs of every `Set-Cookie` that is not `HttpOnly`.
pub fn document_cookie(headers: &[HeaderEntry]) -> String {
    headers
        .iter()
        .filter(|h| h.is("set-cookie"))
        .filter_map(|h| {
            let mut parts = h.value.split(';');
            let pair = parts.next()?.trim();
            let http_only = parts.any(|attr| attr.trim().eq_ignore_ascii_case("httponly"));
            if pair.is_empty() || http_only {
                None
            } else {
                Some(pair.to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `response` to every connection and returns the base URL.
    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut read = Vec::new();
                    while !read.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => read.extend_from_slice(&buf[..n]),
                        }
                    }
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        format!("http://{}/", addr)
    }

    fn host(cache: &Arc<HeaderCache>) -> HttpPageHost {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpPageHost::with_client(Arc::clone(cache), client)
    }

    const FORM_PAGE: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        X-Frame-Options: DENY\r\n\
        Set-Cookie: theme=dark; Path=/\r\n\
        Set-Cookie: sid=abc; HttpOnly\r\n\
        Content-Length: 55\r\n\
        Connection: close\r\n\r\n\
        <html><body><form action=\"/login\"></form></body></html>";

    const JSON_PAGE: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: application/json\r\n\
        Content-Length: 2\r\n\
        Connection: close\r\n\r\n{}";

    #[tokio::test]
    async fn test_navigate_records_headers_and_inspects_document() {
        let url = serve(FORM_PAGE).await;
        let cache = Arc::new(HeaderCache::new());
        let host = host(&cache);

        let session = host.navigate(&url).await.unwrap();

        let headers = cache.lookup(session);
        assert!(headers.iter().any(|h| h.is("x-frame-options") && h.value == "DENY"));
        assert_eq!(headers.iter().filter(|h| h.is("set-cookie")).count(), 2);

        let info = host.resolve(session).await.unwrap();
        assert_eq!(info.url, url);

        let findings = host.inspect(session).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Insecure Form Submission");
        assert!(findings[0].description.contains("/login"));
    }

    #[tokio::test]
    async fn test_non_html_document_is_denied() {
        let url = serve(JSON_PAGE).await;
        let cache = Arc::new(HeaderCache::new());
        let host = host(&cache);

        let session = host.navigate(&url).await.unwrap();
        let err = host.inspect(session).await.unwrap_err();
        assert!(matches!(err, HostError::Denied { .. }));
        assert!(!cache.lookup(session).is_empty());
    }

    #[tokio::test]
    async fn test_navigate_in_overwrites_session() {
        let html = serve(FORM_PAGE).await;
        let json = serve(JSON_PAGE).await;
        let cache = Arc::new(HeaderCache::new());
        let host = host(&cache);

        let session = host.navigate(&html).await.unwrap();
        host.navigate_in(session, &json).await.unwrap();

        assert!(!cache.lookup(session).iter().any(|h| h.is("x-frame-options")));
        assert_eq!(host.resolve(session).await.unwrap().url, json);
    }

    const TRUNCATED_PAGE: &str = "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Content-Security-Policy: default-src 'self'\r\n\
        Content-Length: 500\r\n\
        Connection: close\r\n\r\n<html><body>";

    #[tokio::test]
    async fn test_failed_body_keeps_previous_snapshot_and_document() {
        let good = serve(FORM_PAGE).await;
        let broken = serve(TRUNCATED_PAGE).await;
        let cache = Arc::new(HeaderCache::new());
        let host = host(&cache);

        let session = host.navigate(&good).await.unwrap();
        assert!(host.navigate_in(session, &broken).await.is_err());

        let headers = cache.lookup(session);
        assert!(headers.iter().any(|h| h.is("x-frame-options")));
        assert!(!headers.iter().any(|h| h.is("content-security-policy")));
        assert_eq!(host.resolve(session).await.unwrap().url, good);
    }

    #[tokio::test]
    async fn test_closed_session_is_not_found() {
        let url = serve(FORM_PAGE).await;
        let cache = Arc::new(HeaderCache::new());
        let host = host(&cache);

        let session = host.navigate(&url).await.unwrap();
        assert!(host.close(session));

        assert!(matches!(
            host.resolve(session).await,
            Err(HostError::SessionNotFound(s)) if s == session
        ));
        assert!(matches!(
            host.inspect(SessionId(999)).await,
            Err(HostError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_http_schemes() {
        let cache = Arc::new(HeaderCache::new());
        let host = host(&cache);

        let err = host.navigate("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, HostError::UnsupportedScheme(s) if s == "file"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_document_cookie_skips_http_only() {
        let headers = vec![
            HeaderEntry::new("Set-Cookie", "theme=dark; Path=/; Secure"),
            HeaderEntry::new("set-cookie", "sid=abc; httponly; Secure"),
            HeaderEntry::new("Set-Cookie", "lang=en"),
            HeaderEntry::new("Content-Type", "text/html"),
        ];
        assert_eq!(document_cookie(&headers), "theme=dark; lang=en");
        assert_eq!(document_cookie(&[]), "");
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(None));
        assert!(is_html(Some("text/html")));
        assert!(is_html(Some("Text/HTML; charset=UTF-8")));
        assert!(is_html(Some("application/xhtml+xml")));
        assert!(!is_html(Some("application/pdf")));
    }
}
