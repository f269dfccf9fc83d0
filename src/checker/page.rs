//! Rules evaluated against the live document of a loaded page.
//!
//! The evaluator only reads the document: forms, script tags and the
//! cookies visible to page scripts. URLs are resolved against the document
//! base URL (honouring `<base href>`) the same way the DOM `form.action`
//! and `script.src` properties do.

use crate::model::{Finding, Severity};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Pattern for a jQuery build named by version, e.g. `jquery-1.9.1.js`.
const JQUERY_PATTERN: &str = r"jquery-([\d\.]+)\.js";

/// A loaded document as seen from inside the page.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub url: Url,
    pub html: String,
    /// Equivalent of `document.cookie`: only cookies readable by scripts.
    pub cookie: String,
}

impl PageDocument {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
            cookie: String::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// The document base URL: the first `<base href>` resolved against the
    /// document URL, or the document URL itself.
    fn base_url(&self, html: &Html) -> Url {
        Selector::parse("base[href]")
            .ok()
            .and_then(|selector| {
                html.select(&selector)
                    .next()
                    .and_then(|base| base.value().attr("href"))
                    .and_then(|href| self.url.join(href.trim()).ok())
            })
            .unwrap_or_else(|| self.url.clone())
    }

    /// Resolves an attribute value against `base` the way the DOM reflects
    /// URL attributes. A missing or empty value resolves to the document URL
    /// when `empty_is_self` is set, otherwise to nothing.
    fn resolve(&self, base: &Url, raw: Option<&str>, empty_is_self: bool) -> Option<String> {
        match raw.map(str::trim) {
            None | Some("") if empty_is_self => Some(self.url.to_string()),
            None | Some("") => None,
            Some(value) => Some(
                base.join(value)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| value.to_string()),
            ),
        }
    }
}

/// Runs all page rules. Never mutates the document it inspects.
pub fn evaluate_page(doc: &PageDocument) -> Vec<Finding> {
    let html = Html::parse_document(&doc.html);
    let base = doc.base_url(&html);
    let mut findings = check_forms(doc, &base, &html);

    if !doc.cookie.is_empty() && doc.is_secure() {
        findings.push(Finding::new(
            "Cookie Security",
            "Review cookies to ensure `Secure` and `HttpOnly` flags are used appropriately. \
             This check is informational as page scripts cannot see those flags; only the \
             response headers can confirm them.",
            Severity::Info,
        ));
    }

    if let Some(finding) = check_jquery(doc, &base, &html) {
        findings.push(finding);
    }

    findings
}

fn check_forms(doc: &PageDocument, base: &Url, html: &Html) -> Vec<Finding> {
    let Ok(selector) = Selector::parse("form") else {
        return Vec::new();
    };

    html.select(&selector)
        .filter_map(|form| doc.resolve(base, form.value().attr("action"), true))
        .filter(|action| {
            Url::parse(action)
                .map(|u| u.scheme() == "http")
                .unwrap_or(false)
        })
        .map(|action| {
            Finding::new(
                "Insecure Form Submission",
                format!(
                    "A form on this page submits data to an insecure HTTP URL: {}",
                    action
                ),
                Severity::High,
            )
        })
        .collect()
}

fn check_jquery(doc: &PageDocument, base: &Url, html: &Html) -> Option<Finding> {
    let selector = Selector::parse("script").ok()?;
    let re = Regex::new(JQUERY_PATTERN).ok()?;

    // Only the first script that looks like jQuery is considered.
    let src = html
        .select(&selector)
        .filter_map(|script| doc.resolve(base, script.value().attr("src"), false))
        .find(|src| src.contains("jquery-"))?;

    let version = re.captures(&src)?.get(1)?.as_str();
    if version.starts_with("1.") || version.starts_with("2.") {
        Some(Finding::new(
            "Potentially Vulnerable jQuery",
            format!(
                "The site uses jQuery version {}, which may have known vulnerabilities.",
                version
            ),
            Severity::Medium,
        ))
    } else {
        None
    }
}
