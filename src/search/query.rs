//! Search query parser.
//!
//! Parses provider-style query strings into a structured [`SearchQuery`].
//!
//! # Supported syntax
//!
//! **Simple search**: `invoice` matches subject, from and to.
//!
//! **Field-specific**:
//! - `from:billing@example.com`
//! - `to:me@example.com`
//! - `cc:boss@example.com`
//! - `subject:invoice`
//! - `filename:report.pdf`
//! - `has:attachment`
//!
//! **Date filters** (`YYYY-MM-DD` or `YYYY/MM/DD`):
//! - `after:2024/01/01` / `before:2024-06-01`
//! - `date:2024-01-15`
//!
//! **Operators**:
//! - `term1 term2`: implicit AND
//! - `term1 OR term2`: explicit OR
//! - `-term`: NOT (exclude)
//! - `"exact phrase"`: quoted phrase

use chrono::NaiveDate;

/// Which field to search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchField {
    /// Search in subject + from + to (default).
    All,
    From,
    To,
    Cc,
    Subject,
    Filename,
}

/// How to match text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOperator {
    /// Case-insensitive substring match.
    Contains(String),
    /// Quoted phrase: case-insensitive substring match of the whole phrase.
    Phrase(String),
}

/// A single search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub field: SearchField,
    pub operator: SearchOperator,
    pub negated: bool,
}

/// A fully parsed search query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Text-based search terms (AND by default).
    pub terms: Vec<SearchTerm>,
    /// Messages strictly after this day.
    pub after: Option<NaiveDate>,
    /// Messages strictly before this day.
    pub before: Option<NaiveDate>,
    /// Messages on exactly this day.
    pub on: Option<NaiveDate>,
    /// `Some(true)` for `has:attachment`, `Some(false)` for `-has:attachment`.
    pub has_attachment: Option<bool>,
    /// Whether this is an OR query (any term matches) vs AND (all must match).
    pub is_or: bool,
}

impl SearchQuery {
    /// Whether the query selects everything.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
            && self.after.is_none()
            && self.before.is_none()
            && self.on.is_none()
            && self.has_attachment.is_none()
    }
}

/// Parse a query string into a structured [`SearchQuery`].
///
/// Never fails; unrecognized syntax is treated as a plain text search.
pub fn parse_query(input: &str) -> SearchQuery {
    let mut query = SearchQuery::default();
    let tokens = tokenize(input.trim());
    query.is_or = tokens.iter().any(|t| t == "OR");

    for token in &tokens {
        if token == "OR" {
            continue;
        }

        let (negated, token) = match token.strip_prefix('-') {
            Some(stripped) if !stripped.is_empty() => (true, stripped),
            _ => (false, token.as_str()),
        };

        let Some((key, value)) = token.split_once(':') else {
            query.terms.push(term(SearchField::All, token, negated));
            continue;
        };

        match key.to_ascii_lowercase().as_str() {
            "from" => query.terms.push(term(SearchField::From, value, negated)),
            "to" => query.terms.push(term(SearchField::To, value, negated)),
            "cc" => query.terms.push(term(SearchField::Cc, value, negated)),
            "subject" => query.terms.push(term(SearchField::Subject, value, negated)),
            "filename" => query.terms.push(term(SearchField::Filename, value, negated)),
            "has" if value.eq_ignore_ascii_case("attachment") => {
                query.has_attachment = Some(!negated);
            }
            "after" | "newer" => query.after = parse_query_date(value),
            "before" | "older" => query.before = parse_query_date(value),
            "date" | "on" => query.on = parse_query_date(value),
            // Not a known field: search for the whole token, colon included
            _ => query.terms.push(term(SearchField::All, token, negated)),
        }
    }

    query
}

fn term(field: SearchField, value: &str, negated: bool) -> SearchTerm {
    SearchTerm {
        field,
        operator: make_operator(value),
        negated,
    }
}

/// Build an operator from a value string (quoted → Phrase, otherwise → Contains).
fn make_operator(value: &str) -> SearchOperator {
    match value
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        Some(phrase) => SearchOperator::Phrase(phrase.to_lowercase()),
        None => SearchOperator::Contains(value.to_lowercase()),
    }
}

/// Tokenize input respecting quoted strings.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            current.push(ch);
        } else if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parse `2024-01-04` or `2024/01/04`.
fn parse_query_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}
