//! Email address parsing (RFC 5322 §3.4) for fragment headers.

/// A parsed email address.
///
/// # Examples
/// - `"Jane Doe <jane@x.com>"` → `display_name = "Jane Doe"`, `address = "jane@x.com"`
/// - `"<jane@x.com>"` → `display_name = ""`, `address = "jane@x.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Parse an angle-bracket mailbox (`Name <addr>` or `<addr>`).
    ///
    /// Returns `None` when the value has no well-formed `<…>` part.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let angle_start = trimmed.rfind('<')?;
        let angle_end = trimmed.rfind('>')?;
        if angle_end <= angle_start {
            return None;
        }
        Some(Self {
            display_name: strip_quotes(&trimmed[..angle_start]),
            address: trimmed[angle_start + 1..angle_end].trim().to_string(),
        })
    }

    /// Split a header value into its comma-separated mailboxes.
    ///
    /// Commas inside quotes or angle brackets do not split:
    /// `"Last, First" <a@b.com>, other@c.com` yields two segments.
    pub fn split_list(raw: &str) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut in_quotes = false;
        let mut in_angle = false;
        let mut start = 0;

        for (i, ch) in raw.char_indices() {
            match ch {
                '"' => in_quotes = !in_quotes,
                '<' if !in_quotes => in_angle = true,
                '>' if !in_quotes => in_angle = false,
                ',' if !in_quotes && !in_angle => {
                    segments.push(raw[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        segments.push(raw[start..].trim());
        segments.retain(|s| !s.is_empty());
        segments
    }

    /// The name to show for this mailbox: display name, else the address.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.address
        } else {
            &self.display_name
        }
    }
}

/// Turn a `From`/`To` header value into the text shown in a fragment header.
///
/// Each `Name <addr>` mailbox becomes its display name (or the bare address
/// when the name is empty); lists are joined with `", "`. A value without any
/// angle-bracket mailbox is returned verbatim.
pub fn display_names(raw: &str) -> String {
    let segments = EmailAddress::split_list(raw);
    let parsed: Vec<EmailAddress> = segments
        .iter()
        .filter_map(|s| EmailAddress::parse(s))
        .collect();

    if parsed.is_empty() {
        return raw.to_string();
    }

    segments
        .iter()
        .map(|s| match EmailAddress::parse(s) {
            Some(addr) => addr.label().to_string(),
            None => strip_quotes(s),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("Jane <jane@x.com>").unwrap();
        assert_eq!(addr.display_name, "Jane");
        assert_eq!(addr.address, "jane@x.com");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Last, First\" <user@example.com>").unwrap();
        assert_eq!(addr.display_name, "Last, First");
        assert_eq!(addr.address, "user@example.com");
    }

    #[test]
    fn test_parse_without_brackets_is_none() {
        assert!(EmailAddress::parse("jane@x.com").is_none());
        assert!(EmailAddress::parse("Jane > <").is_none());
        assert!(EmailAddress::parse("").is_none());
    }

    #[test]
    fn test_split_list_with_quoted_comma() {
        let list = EmailAddress::split_list("\"Last, First\" <a@b.com>, other@c.com");
        assert_eq!(list, vec!["\"Last, First\" <a@b.com>", "other@c.com"]);
    }

    #[test]
    fn test_display_names_single() {
        assert_eq!(display_names("Jane <jane@x.com>"), "Jane");
    }

    #[test]
    fn test_display_names_bare_angle_falls_back_to_address() {
        assert_eq!(display_names("<jane@x.com>"), "jane@x.com");
    }

    #[test]
    fn test_display_names_list() {
        assert_eq!(
            display_names("Alice <a@x.com>, \"Smith, Bob\" <b@x.com>, carol@x.com"),
            "Alice, Smith, Bob, carol@x.com"
        );
    }

    #[test]
    fn test_display_names_malformed_is_verbatim() {
        assert_eq!(display_names("jane at example dot com"), "jane at example dot com");
        assert_eq!(display_names("  jane@x.com "), "  jane@x.com ");
    }
}
