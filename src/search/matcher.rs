//! In-memory evaluation of a [`SearchQuery`] against fetched messages.

use chrono::{DateTime, Utc};

use crate::model::message::{Message, Part};
use crate::parser::header::parse_date;

use super::query::{SearchField, SearchOperator, SearchQuery, SearchTerm};

/// Check whether a message matches the query.
///
/// Applies date and attachment filters first (cheapest), then text terms.
pub fn message_matches(message: &Message, query: &SearchQuery) -> bool {
    if query.after.is_some() || query.before.is_some() || query.on.is_some() {
        let Some(date) = message_date(message).map(|d| d.date_naive()) else {
            return false;
        };
        if query.after.is_some_and(|d| date <= d)
            || query.before.is_some_and(|d| date >= d)
            || query.on.is_some_and(|d| date != d)
        {
            return false;
        }
    }

    if let Some(want_att) = query.has_attachment {
        if has_attachment(&message.payload) != want_att {
            return false;
        }
    }

    if query.terms.is_empty() {
        return true;
    }

    if query.is_or {
        query.terms.iter().any(|term| term_matches(message, term))
    } else {
        query.terms.iter().all(|term| term_matches(message, term))
    }
}

/// When the message was received: `internal_date` if set, else the `Date` header.
pub fn message_date(message: &Message) -> Option<DateTime<Utc>> {
    message
        .internal_date
        .as_deref()
        .and_then(|ms| ms.trim().parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .or_else(|| message.header("date").and_then(parse_date))
}

fn term_matches(message: &Message, term: &SearchTerm) -> bool {
    let header = |name: &str| message.header(name).unwrap_or_default();
    let raw_match = match term.field {
        SearchField::All => ["subject", "from", "to"]
            .iter()
            .any(|&name| matches_text(header(name), &term.operator)),
        SearchField::From => matches_text(header("from"), &term.operator),
        SearchField::To => matches_text(header("to"), &term.operator),
        SearchField::Cc => matches_text(header("cc"), &term.operator),
        SearchField::Subject => matches_text(header("subject"), &term.operator),
        SearchField::Filename => attachment_names(&message.payload)
            .iter()
            .any(|name| matches_text(name, &term.operator)),
    };

    raw_match != term.negated
}

/// Case-insensitive text matching.
fn matches_text(haystack: &str, op: &SearchOperator) -> bool {
    let haystack_lower = haystack.to_lowercase();
    match op {
        SearchOperator::Contains(needle) | SearchOperator::Phrase(needle) => {
            haystack_lower.contains(needle.as_str())
        }
    }
}

fn has_attachment(root: &Part) -> bool {
    !attachment_names(root).is_empty()
}

/// Filenames anywhere in the tree.
fn attachment_names(root: &Part) -> Vec<&str> {
    let mut names = Vec::new();
    let mut stack = vec![root];
    while let Some(part) = stack.pop() {
        if let Some(name) = part.attachment_name() {
            names.push(name);
        }
        stack.extend(part.parts.iter().rev());
    }
    names
}
