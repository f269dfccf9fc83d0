//! SARIF (Static Analysis Results Interchange Format) output.
//!
//! Each distinct finding title becomes one rule; every finding becomes one
//! result located at the scanned page URL.

use crate::model::{ScanResult, Severity};
use anyhow::Result;
use serde::Serialize;

/// SARIF v2.1.0 schema root
#[derive(Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: String,
    name: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    default_configuration: SarifRuleConfiguration,
}

#[derive(Serialize)]
struct SarifRuleConfiguration {
    level: &'static str,
}

#[derive(Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: &'static str,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
}

#[derive(Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

fn severity_to_sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low | Severity::Info => "note",
    }
}

/// "X-Content-Type-Options Missing" -> "x-content-type-options-missing"
fn rule_id(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Generate SARIF as a string
pub fn generate_sarif_string(result: &ScanResult) -> Result<String> {
    let mut rules: Vec<SarifRule> = Vec::new();
    let mut results = Vec::new();
    let location_uri = result.url.clone().unwrap_or_default();

    for finding in &result.findings {
        let id = rule_id(&finding.title);

        if !rules.iter().any(|r| r.id == id) {
            rules.push(SarifRule {
                id: id.clone(),
                name: finding.title.clone(),
                short_description: SarifMessage {
                    text: finding.title.clone(),
                },
                default_configuration: SarifRuleConfiguration {
                    level: severity_to_sarif_level(finding.severity),
                },
            });
        }

        results.push(SarifResult {
            rule_id: id,
            level: severity_to_sarif_level(finding.severity),
            message: SarifMessage {
                text: format!("{}: {}", finding.title, finding.description),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifactLocation {
                        uri: location_uri.clone(),
                    },
                },
            }],
        });
    }

    let report = SarifReport {
        schema: "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        version: "2.1.0",
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "pagescan",
                    version: env!("CARGO_PKG_VERSION"),
                    rules,
                },
            },
            results,
        }],
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

/// Generate and print SARIF output
pub fn print_sarif(result: &ScanResult) -> Result<()> {
    println!("{}", generate_sarif_string(result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Finding;

    #[test]
    fn test_rule_id_slug() {
        assert_eq!(rule_id("X-Content-Type-Options Missing"), "x-content-type-options-missing");
        assert_eq!(rule_id("Potentially Vulnerable jQuery"), "potentially-vulnerable-jquery");
    }

    #[test]
    fn test_one_rule_per_title() {
        let result = ScanResult::new(vec![
            Finding::new("Insecure Form Submission", "http://a/", Severity::High),
            Finding::new("Insecure Form Submission", "http://b/", Severity::High),
            Finding::new("Cookie Security", "advisory", Severity::Info),
        ])
        .with_url("https://example.com/");

        let sarif: serde_json::Value =
            serde_json::from_str(&generate_sarif_string(&result).unwrap()).unwrap();
        let run = &sarif["runs"][0];

        assert_eq!(run["tool"]["driver"]["rules"].as_array().unwrap().len(), 2);
        assert_eq!(run["results"].as_array().unwrap().len(), 3);
        assert_eq!(run["results"][0]["level"], "error");
        assert_eq!(run["results"][2]["level"], "note");
        assert_eq!(
            run["results"][0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "https://example.com/"
        );
    }
}
