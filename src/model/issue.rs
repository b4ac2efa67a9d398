use serde::Serialize;
use strum_macros::{EnumIter, IntoStaticStr};

/// How bad an issue is
///
/// Ordered from most to least severe, so sorting ascending puts critical
/// issues first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Score penalty contributed by one issue of this severity
    pub fn penalty(self) -> u32 {
        match self {
            Self::Critical => 5,
            Self::Warning => 2,
            Self::Info => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Area of the site an issue belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Technical,
    Content,
    Links,
    Images,
    StructuredData,
    Security,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Machine-readable issue codes
///
/// The serialized form is the snake_case variant name, e.g. `MissingH1`
/// becomes `"missing_h1"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueCode {
    // fetch outcome
    SslError,
    Timeout,
    ConnectionError,
    InvalidUrl,
    RedirectLoop,
    EmptyResponse,
    NonHtmlContent,
    LargePage,
    CrawlError,
    BlockedByServer,
    CloudflareProtection,
    XrobotsNoindex,
    XrobotsNofollow,

    // url, status, latency
    LongUrl,
    TooManyQueryParams,
    ServerError,
    ClientError,
    Redirect,
    SlowTtfb,
    RedirectChain,

    // title and description
    MissingTitle,
    EmptyTitle,
    ShortTitle,
    LongTitle,
    MissingDescription,
    EmptyDescription,
    ShortDescription,
    LongDescription,

    // meta robots
    Noindex,
    Nofollow,
    MetaNoarchive,
    MetaNosnippet,

    // headings
    MissingH1,
    EmptyH1,
    MultipleH1,
    LongH1,
    H1EqualsTitle,
    HeadingHierarchy,

    // content
    VeryThinContent,
    ThinContent,
    LowTextRatio,

    // canonical
    MissingCanonical,
    MultipleCanonical,
    EmptyCanonical,
    RelativeCanonical,
    CanonicalHttp,
    CanonicalNotSelf,
    CanonicalTargetError,
    CanonicalChain,
    CanonicalCycle,
    CanonicalSitemapConflict,

    // images
    MissingAlt,
    EmptyAltNonDecorative,
    MissingDimensions,
    BrokenImages,
    LargeImages,

    // structured data and social
    InvalidJsonLd,
    SchemaIncomplete,
    SchemaInvalidJson,
    MissingOgTitle,
    MissingOgDesc,
    MissingOgImage,
    MissingTwitter,

    // document head
    MissingViewport,
    WrongCharset,
    MissingCharset,
    MixedContent,
    MissingLang,
    MissingHreflang,
    JsRenderingRisk,

    // links
    NofollowInternal,
    EmptyHrefLinks,
    BrokenInternalLinks,
    BrokenExternalLinks,
    ZeroInlinks,
    LowInlinks,
    DeadEndPage,

    // cross-page duplicates
    DuplicateTitle,
    DuplicateDescription,
    DuplicateContent,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One detected problem on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub category: Category,
    pub code: IssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
}

impl Issue {
    /// Creates an issue without current/expected values
    pub fn new(
        severity: Severity,
        category: Category,
        code: IssueCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            code,
            message: message.into(),
            current_value: None,
            expected_value: None,
        }
    }

    /// Attaches the observed value and the value the check expected
    pub fn with_values(mut self, current: impl Into<String>, expected: impl Into<String>) -> Self {
        self.current_value = Some(current.into());
        self.expected_value = Some(expected.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_issue_code_names() {
        assert_eq!(IssueCode::MissingH1.as_str(), "missing_h1");
        assert_eq!(IssueCode::H1EqualsTitle.as_str(), "h1_equals_title");
        assert_eq!(IssueCode::MetaNoarchive.as_str(), "meta_noarchive");
        assert_eq!(IssueCode::XrobotsNoindex.as_str(), "xrobots_noindex");
        assert_eq!(IssueCode::MissingOgDesc.as_str(), "missing_og_desc");
        assert_eq!(IssueCode::InvalidJsonLd.as_str(), "invalid_json_ld");
    }

    #[test]
    fn test_serialized_code_matches_static_name() {
        for code in IssueCode::iter() {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_severity_order_and_penalty() {
        let mut severities = vec![Severity::Info, Severity::Critical, Severity::Warning];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Warning, Severity::Info]
        );
        assert_eq!(Severity::Critical.penalty(), 5);
        assert_eq!(Severity::Warning.penalty(), 2);
        assert_eq!(Severity::Info.penalty(), 0);
    }

    #[test]
    fn test_issue_serialization() {
        let issue = Issue::new(
            Severity::Critical,
            Category::Technical,
            IssueCode::CanonicalHttp,
            "Canonical points to HTTP",
        )
        .with_values("http://example.com/x", "https://example.com/x");

        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["category"], "technical");
        assert_eq!(json["code"], "canonical_http");
        assert_eq!(json["currentValue"], "http://example.com/x");
    }

    #[test]
    fn test_issue_without_values_omits_them() {
        let issue = Issue::new(
            Severity::Info,
            Category::StructuredData,
            IssueCode::MissingTwitter,
            "No Twitter Card",
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("currentValue").is_none());
        assert_eq!(json["category"], "structured_data");
    }
}
