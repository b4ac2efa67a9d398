use super::warning;
use crate::analyzer::{schema_items, schema_type};
use crate::model::{Category, IssueCode, SchemaFinding, SiteAuditResult};
use serde_json::Value;

/// Properties a JSON-LD object of the given `@type` must carry
fn required_fields(schema_type: &str) -> &'static [&'static str] {
    match schema_type {
        "Article" | "NewsArticle" | "BlogPosting" => &["headline", "author", "datePublished"],
        "Product" => &["name", "offers"],
        "LocalBusiness" => &["name", "address"],
        "Organization" => &["name", "url"],
        "FAQPage" => &["mainEntity"],
        "BreadcrumbList" => &["itemListElement"],
        "WebSite" => &["name", "url"],
        "Event" => &["name", "startDate", "location"],
        _ => &[],
    }
}

/// A present-but-empty value counts as missing
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Checks every parsed JSON-LD block for the required properties of its type
pub(super) fn validate_schemas(result: &mut SiteAuditResult) {
    let mut findings = Vec::new();

    for page in result.pages.values_mut() {
        let mut page_findings = Vec::new();
        for block in &page.json_ld {
            let Some(block) = block else {
                page_findings.push(SchemaFinding {
                    url: page.url.clone(),
                    schema_type: "JSON-LD".to_string(),
                    missing: vec!["valid_json".to_string()],
                });
                continue;
            };
            for item in schema_items(block) {
                let Some(kind) = schema_type(item) else {
                    continue;
                };
                let missing: Vec<String> = required_fields(kind)
                    .iter()
                    .filter(|field| item.get(**field).map_or(true, is_blank))
                    .map(|field| field.to_string())
                    .collect();
                if !missing.is_empty() {
                    page_findings.push(SchemaFinding {
                        url: page.url.clone(),
                        schema_type: kind.to_string(),
                        missing,
                    });
                }
            }
        }

        for finding in &page_findings {
            let issue = if finding.schema_type == "JSON-LD" {
                warning(
                    Category::StructuredData,
                    IssueCode::SchemaInvalidJson,
                    "JSON-LD block is not valid JSON",
                )
            } else {
                warning(
                    Category::StructuredData,
                    IssueCode::SchemaIncomplete,
                    format!("{} markup is missing required fields", finding.schema_type),
                )
                .with_values(finding.missing.join(", "), "all required fields")
            };
            page.push_issue(issue);
        }
        findings.extend(page_findings);
    }

    result.schema_validation_issues = findings;
}
