//! On-page SEO analysis.
//!
//! The HTML is parsed with html5ever into an `RcDom`, one walk collects
//! [`PageFacts`], and a fixed rubric turns the facts into a 0–100 score.
//! Every check starts from 100 and subtracts a fixed amount:
//!
//! | check                                        | points |
//! |----------------------------------------------|-------:|
//! | missing `<title>`                            | 20 |
//! | title shorter than 30 or longer than 60      | 5  |
//! | missing meta description                     | 20 |
//! | description shorter than 120 or longer than 160 | 5 |
//! | missing `<h1>`                               | 15 |
//! | more than one `<h1>`                         | 5  |
//! | missing viewport meta                        | 10 |
//! | images without `alt`                         | 5  |
//! | missing `<html lang>`                        | 5  |
//! | missing canonical link                       | 5  |
//! | missing Open Graph title or description      | 5  |
//! | fewer than 300 words of body text            | 10 |
//! | robots meta contains `noindex`               | 10 |

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::{resolve_input, SelectedFile};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const TITLE_MIN: usize = 30;
pub const TITLE_MAX: usize = 60;
pub const DESCRIPTION_MIN: usize = 120;
pub const DESCRIPTION_MAX: usize = 160;
pub const MIN_WORDS: usize = 300;

/// Recursion guard for pathological nesting.
const MAX_DEPTH: usize = 512;

/// Raw observations about a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFacts {
    pub title: Option<String>,
    pub description: Option<String>,
    pub has_viewport: bool,
    pub robots: Option<String>,
    pub lang: Option<String>,
    pub canonical: Option<String>,
    pub og_title: bool,
    pub og_description: bool,
    pub h1_count: usize,
    pub h2_count: usize,
    pub image_count: usize,
    pub images_missing_alt: usize,
    pub link_count: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeoIssue {
    /// Stable identifier, e.g. `title-length`.
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
    /// Points subtracted.
    pub deduction: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeoReport {
    /// 0–100.
    pub score: u32,
    pub issues: Vec<SeoIssue>,
    pub facts: PageFacts,
}

impl SeoReport {
    /// Letter grade for display.
    pub fn grade(&self) -> char {
        match self.score {
            90..=100 => 'A',
            80..=89 => 'B',
            70..=79 => 'C',
            50..=69 => 'D',
            _ => 'F',
        }
    }
}

/// Parse `html` and score it.
pub fn analyze_html(html: &str) -> SeoReport {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let mut facts = PageFacts::default();
    let mut body_text = String::new();
    walk(&dom.document, &mut facts, &mut body_text, false, 0);
    facts.word_count = body_text.split_whitespace().count();
    score(facts)
}

/// Analyze an uploaded HTML file.
pub fn analyze_file(file: &SelectedFile) -> SeoReport {
    analyze_html(&String::from_utf8_lossy(&file.bytes))
}

/// Fetch a page (or read a local file) and analyze it.
pub async fn analyze_source(source: &str, config: &ToolkitConfig) -> Result<SeoReport, AxevoraError> {
    let file = resolve_input(source, config.download_timeout_secs).await?;
    let report = analyze_file(&file);
    info!("SEO score for {}: {} ({} issues)", source, report.score, report.issues.len());
    Ok(report)
}

fn attr(node: &Handle, name: &str) -> Option<String> {
    let NodeData::Element { ref attrs, .. } = node.data else {
        return None;
    };
    let attrs = attrs.borrow();
    attrs
        .iter()
        .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
        .map(|a| a.value.to_string())
}

fn text_of(node: &Handle, out: &mut String, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    for child in node.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => text_of(child, out, depth + 1),
            _ => {}
        }
    }
}

fn walk(node: &Handle, facts: &mut PageFacts, body: &mut String, in_body: bool, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    let mut in_body = in_body;
    match node.data {
        NodeData::Text { ref contents } => {
            if in_body {
                body.push(' ');
                body.push_str(&contents.borrow());
            }
            return;
        }
        NodeData::Element { ref name, .. } => {
            let tag = name.local.as_ref();
            match tag {
                "html" => {
                    facts.lang = attr(node, "lang").filter(|l| !l.trim().is_empty());
                }
                "title" if facts.title.is_none() => {
                    let mut t = String::new();
                    text_of(node, &mut t, depth);
                    let t = t.trim().to_string();
                    if !t.is_empty() {
                        facts.title = Some(t);
                    }
                    return;
                }
                "meta" => {
                    let content = attr(node, "content").unwrap_or_default();
                    let content = content.trim().to_string();
                    let key = attr(node, "name")
                        .or_else(|| attr(node, "property"))
                        .unwrap_or_default()
                        .to_ascii_lowercase();
                    match key.as_str() {
                        "description" if !content.is_empty() => facts.description = Some(content),
                        "viewport" => facts.has_viewport = true,
                        "robots" => facts.robots = Some(content.to_ascii_lowercase()),
                        "og:title" if !content.is_empty() => facts.og_title = true,
                        "og:description" if !content.is_empty() => facts.og_description = true,
                        _ => {}
                    }
                }
                "link" => {
                    let rel = attr(node, "rel").unwrap_or_default().to_ascii_lowercase();
                    if rel.split_whitespace().any(|r| r == "canonical") {
                        facts.canonical = attr(node, "href").filter(|h| !h.trim().is_empty());
                    }
                }
                "body" => in_body = true,
                "h1" => facts.h1_count += 1,
                "h2" => facts.h2_count += 1,
                "a" if attr(node, "href").is_some() => facts.link_count += 1,
                "img" => {
                    facts.image_count += 1;
                    if attr(node, "alt").is_none_or(|a| a.trim().is_empty()) {
                        facts.images_missing_alt += 1;
                    }
                }
                "script" | "style" | "noscript" | "template" => return,
                _ => {}
            }
        }
        _ => {}
    }
    for child in node.children.borrow().iter() {
        walk(child, facts, body, in_body, depth + 1);
    }
}

/// Apply the rubric to collected facts.
pub fn score(facts: PageFacts) -> SeoReport {
    let mut issues = Vec::new();
    let mut push = |check: &'static str, severity, deduction, message: String| {
        issues.push(SeoIssue {
            check,
            severity,
            message,
            deduction,
        });
    };

    match &facts.title {
        None => push("title-missing", Severity::Error, 20, "Page has no <title>".into()),
        Some(t) => {
            let len = t.chars().count();
            if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
                push(
                    "title-length",
                    Severity::Notice,
                    5,
                    format!("Title is {len} characters; aim for {TITLE_MIN}–{TITLE_MAX}"),
                );
            }
        }
    }

    match &facts.description {
        None => push(
            "description-missing",
            Severity::Error,
            20,
            "Page has no meta description".into(),
        ),
        Some(d) => {
            let len = d.chars().count();
            if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&len) {
                push(
                    "description-length",
                    Severity::Notice,
                    5,
                    format!("Description is {len} characters; aim for {DESCRIPTION_MIN}–{DESCRIPTION_MAX}"),
                );
            }
        }
    }

    match facts.h1_count {
        0 => push("h1-missing", Severity::Error, 15, "Page has no <h1> heading".into()),
        1 => {}
        n => push(
            "h1-multiple",
            Severity::Notice,
            5,
            format!("Page has {n} <h1> headings; use exactly one"),
        ),
    }

    if !facts.has_viewport {
        push(
            "viewport-missing",
            Severity::Warning,
            10,
            "No viewport meta tag; the page may not render well on mobile".into(),
        );
    }

    if facts.images_missing_alt > 0 {
        push(
            "img-alt",
            Severity::Notice,
            5,
            format!(
                "{} of {} images have no alt text",
                facts.images_missing_alt, facts.image_count
            ),
        );
    }

    if facts.lang.is_none() {
        push("lang-missing", Severity::Notice, 5, "<html> has no lang attribute".into());
    }

    if facts.canonical.is_none() {
        push("canonical-missing", Severity::Notice, 5, "No canonical link".into());
    }

    if !(facts.og_title && facts.og_description) {
        push(
            "open-graph",
            Severity::Notice,
            5,
            "Open Graph og:title and og:description should both be set".into(),
        );
    }

    if facts.word_count < MIN_WORDS {
        push(
            "thin-content",
            Severity::Warning,
            10,
            format!("Only {} words of body text; aim for at least {MIN_WORDS}", facts.word_count),
        );
    }

    if facts.robots.as_deref().is_some_and(|r| r.contains("noindex")) {
        push(
            "noindex",
            Severity::Warning,
            10,
            "robots meta contains noindex; search engines will skip this page".into(),
        );
    }

    let total: u32 = issues.iter().map(|i| i.deduction).sum();
    SeoReport {
        score: 100u32.saturating_sub(total),
        issues,
        facts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn good_page() -> String {
        format!(
            r#"<!doctype html>
<html lang="en"><head>
<title>Free Online PDF Tools to Merge and Split Files</title>
<meta name="description" content="{desc}">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta property="og:title" content="PDF tools">
<meta property="og:description" content="Merge and split PDFs">
<link rel="canonical" href="https://example.com/pdf">
<script>var ignored = "{script}";</script>
</head><body><h1>PDF tools</h1><img src="a.png" alt="logo"><p>{body}</p></body></html>"#,
            desc = "d".repeat(140),
            script = words(50),
            body = words(320)
        )
    }

    #[test]
    fn perfect_page_scores_100() {
        let report = analyze_html(&good_page());
        assert_eq!(report.issues, vec![], "{:#?}", report.facts);
        assert_eq!(report.score, 100);
        assert_eq!(report.grade(), 'A');
    }

    #[test]
    fn empty_document_keeps_only_unpenalised_points() {
        let report = analyze_html("");
        // 20+20+15+10+5+5+5+10 = 90 → 10
        assert_eq!(report.score, 10);
        assert!(report.issues.iter().any(|i| i.check == "title-missing"));
    }

    #[test]
    fn all_deductions_saturate() {
        let facts = PageFacts {
            robots: Some("noindex".into()),
            h1_count: 0,
            images_missing_alt: 2,
            image_count: 2,
            ..Default::default()
        };
        assert_eq!(score(facts).score, 0);
    }

    #[test]
    fn title_and_description_length() {
        let html = good_page()
            .replace("Free Online PDF Tools to Merge and Split Files", "Short")
            .replace(&"d".repeat(140), "tiny");
        let report = analyze_html(&html);
        let checks: Vec<_> = report.issues.iter().map(|i| i.check).collect();
        assert_eq!(checks, vec!["title-length", "description-length"]);
        assert_eq!(report.score, 90);
    }

    #[test]
    fn counts_headings_images_and_noindex() {
        let html = good_page()
            .replace("<h1>PDF tools</h1>", "<h1>a</h1><h1>b</h1><img src=x.png>")
            .replace("</head>", r#"<meta name="robots" content="NOINDEX, follow"></head>"#);
        let report = analyze_html(&html);
        assert_eq!(report.facts.h1_count, 2);
        assert_eq!(report.facts.images_missing_alt, 1);
        assert_eq!(report.score, 100 - 5 - 5 - 10);
    }

    #[test]
    fn script_text_is_not_counted() {
        let html = "<html><body><script>one two three</script><p>four five</p></body></html>";
        let report = analyze_html(html);
        assert_eq!(report.facts.word_count, 2);
    }

    #[test]
    fn report_serialises() {
        let json = serde_json::to_string(&analyze_html("<p>x</p>")).unwrap();
        assert!(json.contains("\"severity\":\"error\""));
    }
}
