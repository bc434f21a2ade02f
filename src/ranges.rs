//! Page-range parsing shared by every PDF tool.
//!
//! Users type selections such as `"1, 3-5, 10"`. This module turns that text
//! into 0-indexed page numbers, checked against the page count read when the
//! document was loaded.
//!
//! ## Rules
//!
//! - tokens are separated by commas and trimmed;
//! - a token with no hyphen is a single page, kept if `1 ≤ n ≤ page_count`;
//! - a token with one hyphen is an inclusive range; pages outside
//!   `[1, page_count]` are dropped, the rest kept;
//! - a reversed range (`"5-2"`) selects nothing;
//! - anything else (`"abc"`, `"1-2-3"`, `"-4"`) is skipped silently.
//!
//! The parser never fails: an empty result is a user error, but only the
//! calling tool knows how to phrase it, so [`PageSelection::resolve`] raises
//! [`AxevoraError::EmptySelection`].
//!
//! ## Policies
//!
//! Most tools treat the selection as a set (sorted, deduplicated). Rearrange
//! is the exception: the order typed is the output order and repeating a page
//! duplicates it. [`SelectionPolicy`] makes that choice explicit per tool.

use crate::error::AxevoraError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parse a range string into a sorted, deduplicated set of 0-indexed pages.
///
/// ```rust
/// use axevora::ranges::parse_ranges;
///
/// let pages = parse_ranges("1, 3-5, 10", 5);
/// assert_eq!(pages.into_iter().collect::<Vec<_>>(), vec![0, 2, 3, 4]);
/// ```
pub fn parse_ranges(input: &str, page_count: usize) -> BTreeSet<usize> {
    parse_page_order(input, page_count).into_iter().collect()
}

/// Parse a range string preserving the typed order and repeats.
///
/// `"3,1,2"` on a 10-page document gives `[2, 0, 1]`; `"1,1"` gives `[0, 0]`.
pub fn parse_page_order(input: &str, page_count: usize) -> Vec<usize> {
    let mut pages = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let parts: Vec<&str> = token.split('-').map(str::trim).collect();
        match parts.as_slice() {
            [single] => {
                if let Ok(n) = single.parse::<usize>() {
                    if (1..=page_count).contains(&n) {
                        pages.push(n - 1);
                    }
                }
            }
            [start, end] => {
                let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else {
                    continue;
                };
                // Clip before iterating so "1-999999999" stays cheap.
                let first = start.max(1);
                let last = end.min(page_count);
                if first <= last {
                    pages.extend((first..=last).map(|n| n - 1));
                }
            }
            _ => {}
        }
    }
    pages
}

/// Pages of `0..page_count` that are not in `selected`, in ascending order.
pub fn complement(selected: &BTreeSet<usize>, page_count: usize) -> Vec<usize> {
    (0..page_count).filter(|p| !selected.contains(p)).collect()
}

/// Render 0-indexed pages in canonical 1-indexed form, e.g. `"1,3-5"`.
///
/// Consecutive runs collapse into ranges, so
/// `parse_ranges(&format_ranges(&s), n) == s` for any in-bounds set `s`.
pub fn format_ranges(pages: &BTreeSet<usize>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = pages.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push((start + 1).to_string());
        } else {
            parts.push(format!("{}-{}", start + 1, end + 1));
        }
    }
    parts.join(",")
}

/// How a tool interprets a page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Sorted and deduplicated (extract, delete, rotate, split, render). (default)
    #[default]
    Set,
    /// Typed order kept, repeats allowed (rearrange).
    Ordered,
}

/// Specifies which pages of a document a tool works on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// User-typed range text such as `"1,3-5"`.
    Ranges(String),
}

impl PageSelection {
    /// `"all"` (any case) or empty input means every page; anything else is
    /// kept as range text.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            PageSelection::All
        } else {
            PageSelection::Ranges(trimmed.to_string())
        }
    }

    /// Expand into 0-indexed pages under `policy`, without error reporting.
    pub fn to_indices(&self, page_count: usize, policy: SelectionPolicy) -> Vec<usize> {
        match (self, policy) {
            (PageSelection::All, _) => (0..page_count).collect(),
            (PageSelection::Ranges(text), SelectionPolicy::Set) => {
                parse_ranges(text, page_count).into_iter().collect()
            }
            (PageSelection::Ranges(text), SelectionPolicy::Ordered) => {
                parse_page_order(text, page_count)
            }
        }
    }

    /// Expand into 0-indexed pages, rejecting an empty result.
    pub fn resolve(
        &self,
        page_count: usize,
        policy: SelectionPolicy,
    ) -> Result<Vec<usize>, AxevoraError> {
        let pages = self.to_indices(page_count, policy);
        if pages.is_empty() {
            return Err(AxevoraError::EmptySelection {
                input: match self {
                    PageSelection::All => "all".to_string(),
                    PageSelection::Ranges(text) => text.clone(),
                },
                total: page_count,
            });
        }
        Ok(pages)
    }
}
