//! Security header rules evaluated over a top-level document response.

use crate::model::{find_header, Finding, HeaderEntry, Severity};

const CSP: &str = "content-security-policy";
const HSTS: &str = "strict-transport-security";
const CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
const FRAME_OPTIONS: &str = "x-frame-options";

/// Evaluates the header rules in their fixed order.
///
/// Pure: the same input always yields the same findings. Malformed values
/// are compared literally and never rejected.
pub fn evaluate_headers(headers: &[HeaderEntry]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let has = |name: &str| find_header(headers, name).is_some();

    if !has(CSP) {
        findings.push(Finding::new(
            "CSP Missing",
            "Content-Security-Policy helps prevent XSS and other injection attacks. It should be implemented.",
            Severity::Medium,
        ));
    }

    if !has(HSTS) {
        findings.push(Finding::new(
            "HSTS Missing",
            "Strict-Transport-Security enforces secure (HTTPS) connections to the server.",
            Severity::Medium,
        ));
    }

    match find_header(headers, CONTENT_TYPE_OPTIONS) {
        None => findings.push(Finding::new(
            "X-Content-Type-Options Missing",
            "This header prevents the browser from MIME-sniffing a response away from the declared content-type.",
            Severity::Low,
        )),
        Some(header) if !header.value.eq_ignore_ascii_case("nosniff") => {
            findings.push(Finding::new(
                "X-Content-Type-Options Misconfigured",
                format!(
                    "Header should be set to 'nosniff', but is '{}'.",
                    header.value
                ),
                Severity::Low,
            ))
        }
        Some(_) => {}
    }

    // A present CSP counts as clickjacking mitigation even without frame-ancestors.
    if !has(FRAME_OPTIONS) && !has(CSP) {
        findings.push(Finding::new(
            "Clickjacking Protection Missing",
            "Use X-Frame-Options or a CSP frame-ancestors directive to prevent clickjacking attacks.",
            Severity::High,
        ));
    }

    findings
}
