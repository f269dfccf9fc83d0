use crate::model::{ScanResult, Severity};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    println!();
    if let Some(url) = &result.url {
        println!("Page: {}", url);
    }
    println!(
        "Scan completed at: {}",
        result.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    if result.findings.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    println!("Found {} issues:", result.findings.len());
    println!();

    // Stable sort keeps rule order within a severity
    let mut findings = result.findings.clone();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));

    let rows: Vec<FindingRow> = findings
        .iter()
        .map(|f| FindingRow {
            severity: format_severity(&f.severity),
            title: f.title.clone(),
            description: truncate(&f.description, 70),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    println!();
    print_summary(result);

    Ok(())
}

fn format_severity(severity: &Severity) -> String {
    match severity {
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Medium => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Severity::Low => "\x1b[32mLOW\x1b[0m".to_string(),
        Severity::Info => "INFO".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

fn print_summary(result: &ScanResult) {
    println!("Summary:");
    println!(
        "  {} high, {} medium, {} low, {} info",
        result.count(Severity::High),
        result.count(Severity::Medium),
        result.count(Severity::Low),
        result.count(Severity::Info)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
    }
}
