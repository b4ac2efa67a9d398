use super::{add_issue, add_issue_with_values, element_text};
use crate::model::{Category, Heading, IssueCode, PageResult, Severity};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Characters of an H1 before it is flagged as long
const H1_MAX_LEN: usize = 70;

/// Characters of heading text kept in the outline
const HEADING_TEXT_CHARS: usize = 100;

static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("heading selector should be valid")
});

pub(super) fn check_headings(result: &mut PageResult, document: &Html) {
    let mut outline = Vec::new();
    let mut h1_list = Vec::new();

    for element in document.select(&HEADING_SELECTOR) {
        let level = element.value().name()[1..].parse::<u8>().unwrap_or(6);
        let text = element_text(&element);
        if level == 1 {
            h1_list.push(text.clone());
        }
        outline.push(Heading {
            level,
            text: text.chars().take(HEADING_TEXT_CHARS).collect(),
        });
    }

    let h1_count = h1_list.len();
    let empty_h1 = h1_list.iter().filter(|t| t.is_empty()).count();
    result.h1_count = h1_count;

    if h1_count == 0 {
        add_issue_with_values(
            result,
            Severity::Critical,
            Category::Content,
            IssueCode::MissingH1,
            "Missing H1 heading",
            "0",
            "1",
        );
    } else if empty_h1 > 0 {
        add_issue_with_values(
            result,
            Severity::Critical,
            Category::Content,
            IssueCode::EmptyH1,
            format!("Empty H1 heading: {}", empty_h1),
            empty_h1.to_string(),
            "0",
        );
    }

    if h1_count > 1 {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Content,
            IssueCode::MultipleH1,
            format!("Multiple H1 headings: {}", h1_count),
            h1_count.to_string(),
            "1",
        );
    } else if let [only] = h1_list.as_slice() {
        let length = only.chars().count();
        if length > H1_MAX_LEN {
            add_issue_with_values(
                result,
                Severity::Info,
                Category::Content,
                IssueCode::LongH1,
                format!("H1 is too long: {} chars", length),
                format!("{} chars", length),
                format!("<{} chars", H1_MAX_LEN),
            );
        }
    }

    if let Some(first) = h1_list.first() {
        if !result.title.is_empty() && result.title.trim().to_lowercase() == first.trim().to_lowercase()
        {
            add_issue(
                result,
                Severity::Info,
                Category::Content,
                IssueCode::H1EqualsTitle,
                "H1 is identical to the title",
            );
        }
    }

    // A level may go deeper by one step at a time
    let mut previous = 0u8;
    let mut broken = false;
    for heading in &outline {
        if previous > 0 && heading.level > previous + 1 {
            broken = true;
            break;
        }
        previous = heading.level;
    }
    if broken {
        add_issue(
            result,
            Severity::Info,
            Category::Content,
            IssueCode::HeadingHierarchy,
            "Heading hierarchy skips a level",
        );
    }

    result.h1_list = h1_list;
    result.headings = outline;
}
