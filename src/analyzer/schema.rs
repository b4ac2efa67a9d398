use super::add_issue;
use crate::model::{Category, IssueCode, PageResult, Severity};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("json-ld selector should be valid")
});
static MICRODATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[itemscope]").expect("itemscope selector should be valid"));

/// `@type` of a JSON-LD object; an array of types yields its first entry
pub(crate) fn schema_type(item: &Value) -> Option<&str> {
    match item.get("@type")? {
        Value::String(t) if !t.is_empty() => Some(t.as_str()),
        Value::Array(types) => types.first().and_then(Value::as_str),
        _ => None,
    }
}

/// Top-level JSON-LD objects of a parsed block
pub(crate) fn schema_items(block: &Value) -> Vec<&Value> {
    match block {
        Value::Object(_) => vec![block],
        Value::Array(items) => items.iter().filter(|i| i.is_object()).collect(),
        _ => Vec::new(),
    }
}

/// Parses every JSON-LD block and detects microdata
///
/// Parsed blocks are kept on the result for the site-level schema
/// validation; a block that fails to parse is kept as `None`.
pub(super) fn check_schema(result: &mut PageResult, document: &Html) {
    for script in document.select(&JSON_LD_SELECTOR) {
        result.has_schema = true;
        let payload = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&payload) {
            Ok(block) => {
                let types: Vec<String> = schema_items(&block)
                    .into_iter()
                    .filter_map(schema_type)
                    .map(str::to_string)
                    .collect();
                result.schema_types.extend(types);
                result.json_ld.push(Some(block));
            }
            Err(e) => {
                tracing::debug!("Invalid JSON-LD on {}: {}", result.url, e);
                result.json_ld.push(None);
                add_issue(
                    result,
                    Severity::Warning,
                    Category::StructuredData,
                    IssueCode::InvalidJsonLd,
                    "Invalid JSON-LD (parse error)",
                );
            }
        }
    }

    if document.select(&MICRODATA_SELECTOR).next().is_some() {
        result.has_microdata = true;
    }
}
