//! Search: provider-style query parsing and in-memory matching.

pub mod matcher;
pub mod query;

use std::cmp::Reverse;

use crate::model::message::{Message, MessageRef};

use self::matcher::{message_date, message_matches};
use self::query::parse_query;

/// Filter `messages` by `query_str` and return references newest first,
/// the order a provider search returns.
///
/// Undated messages sort last. Ties keep their input order.
pub fn select<'a>(messages: impl IntoIterator<Item = &'a Message>, query_str: &str) -> Vec<MessageRef> {
    let query = parse_query(query_str);

    let mut hits: Vec<&Message> = messages
        .into_iter()
        .filter(|m| query.is_empty() || message_matches(m, &query))
        .collect();
    hits.sort_by_key(|m| Reverse(message_date(m)));

    hits.into_iter()
        .map(|m| MessageRef { id: m.id.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(id: &str, millis: Option<&str>) -> Message {
        Message {
            id: id.into(),
            internal_date: millis.map(str::to_string),
            ..Message::default()
        }
    }

    #[test]
    fn test_select_orders_newest_first() {
        let msgs = vec![
            dated("old", Some("1000")),
            dated("none", None),
            dated("new", Some("3000")),
            dated("mid", Some("2000")),
        ];
        let ids: Vec<String> = select(&msgs, "").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["new", "mid", "old", "none"]);
    }
}
