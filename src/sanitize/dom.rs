//! A small typed DOM for HTML fragments.
//!
//! The tree is populated from the `html5ever` tokenizer without running the
//! full tree-construction algorithm: tags nest exactly as written, unmatched
//! end tags are ignored and anything still open at the end is closed. That
//! keeps parse → serialize → parse stable, which the sanitizer relies on.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};

/// Deepest element nesting kept; tags opened beyond it are dropped and
/// their content is attached to the deepest open element.
pub const MAX_NESTING: usize = 256;

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

/// A DOM node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

/// A parsed HTML fragment: a forest of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Vec<Node>,
}

impl Fragment {
    /// Parse an HTML string. Never fails; malformed markup is recovered.
    pub fn parse(html: &str) -> Self {
        let mut tokenizer = Tokenizer::new(TreeSink::default(), TokenizerOpts::default());
        let mut input = BufferQueue::default();
        input.push_back(StrTendril::from_slice(html));
        while let TokenizerResult::Script(()) = tokenizer.feed(&mut input) {}
        tokenizer.end();
        tokenizer.sink.finish()
    }

    /// Remove every element matching `pred`, together with its content.
    pub fn remove(&mut self, pred: &dyn Fn(&Element) -> bool) {
        remove_in(&mut self.children, pred);
    }

    /// Replace every element matching `pred` with its children.
    pub fn unwrap_preserving_children(&mut self, pred: &dyn Fn(&Element) -> bool) {
        self.children = unwrap_in(std::mem::take(&mut self.children), pred);
    }

    /// Drop all attributes from every element.
    pub fn clear_attributes(&mut self) {
        clear_in(&mut self.children);
    }

    /// Serialize back to HTML, escaping text and attribute values.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }
}

fn remove_in(nodes: &mut Vec<Node>, pred: &dyn Fn(&Element) -> bool) {
    nodes.retain(|n| !matches!(n, Node::Element(el) if pred(el)));
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            remove_in(&mut el.children, pred);
        }
    }
}

fn unwrap_in(nodes: Vec<Node>, pred: &dyn Fn(&Element) -> bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(mut el) => {
                let children = unwrap_in(std::mem::take(&mut el.children), pred);
                if pred(&el) {
                    out.extend(children);
                } else {
                    el.children = children;
                    out.push(Node::Element(el));
                }
            }
            text => out.push(text),
        }
    }
    out
}

fn clear_in(nodes: &mut [Node]) {
    for node in nodes {
        if let Node::Element(el) = node {
            el.attrs.clear();
            clear_in(&mut el.children);
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => escape_into(text, false, out),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

/// Escape HTML special characters.
pub fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Escape HTML special characters into a new string.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, false, &mut out);
    out
}

/// Builds a [`Fragment`] from tokenizer output.
#[derive(Default)]
struct TreeSink {
    root: Vec<Node>,
    /// Open elements, innermost last.
    open: Vec<Element>,
}

impl TreeSink {
    fn current_children(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(el) => &mut el.children,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.current_children();
        if let Some(Node::Text(last)) = children.last_mut() {
            last.push_str(text);
        } else {
            children.push(Node::Text(text.to_string()));
        }
    }

    /// Close the innermost open element, attaching it to its parent.
    fn close_one(&mut self) {
        if let Some(el) = self.open.pop() {
            self.current_children().push(Node::Element(el));
        }
    }

    fn start_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        let raw_kind = raw_text_kind(&name);

        if self.open.len() >= MAX_NESTING && raw_kind.is_none() {
            return TokenSinkResult::Continue;
        }

        let mut el = Element::new(name);
        el.attrs = tag
            .attrs
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect();

        if el.is_void() {
            self.current_children().push(Node::Element(el));
        } else {
            self.open.push(el);
        }

        match raw_kind {
            Some(kind) if !tag.self_closing => TokenSinkResult::RawData(kind),
            _ => TokenSinkResult::Continue,
        }
    }

    fn end_tag(&mut self, tag: Tag) {
        let name = &*tag.name;
        if let Some(pos) = self.open.iter().rposition(|el| el.name == name) {
            while self.open.len() > pos {
                self.close_one();
            }
        }
    }

    fn finish(mut self) -> Fragment {
        while !self.open.is_empty() {
            self.close_one();
        }
        Fragment { children: self.root }
    }
}

impl TokenSink for TreeSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => return self.start_tag(tag),
                TagKind::EndTag => self.end_tag(tag),
            },
            Token::CharacterTokens(text) => self.push_text(&text),
            Token::CommentToken(_)
            | Token::DoctypeToken(_)
            | Token::NullCharacterToken
            | Token::EOFToken
            | Token::ParseError(_) => {}
        }
        TokenSinkResult::Continue
    }
}

/// Elements whose content the tokenizer must read as raw text.
///
/// Only elements the sanitizer removes are switched; re-serializing raw
/// text of a kept element would not round-trip.
fn raw_text_kind(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" | "iframe" | "noembed" | "noframes" | "noscript" | "xmp" => Some(RawKind::Rawtext),
        "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let frag = Fragment::parse("<p>a <b>bold</b></p>tail");
        assert_eq!(frag.children.len(), 2);
        let Node::Element(p) = &frag.children[0] else {
            panic!("expected element");
        };
        assert_eq!(p.name, "p");
        assert_eq!(p.children.len(), 2);
        assert_eq!(frag.children[1], Node::Text("tail".into()));
    }

    #[test]
    fn test_tag_names_lowercased_and_attrs_kept() {
        let frag = Fragment::parse("<A HREF=\"x\">y</A>");
        assert_eq!(frag.to_html(), "<a href=\"x\">y</a>");
    }

    #[test]
    fn test_unclosed_elements_are_closed() {
        assert_eq!(Fragment::parse("<div><p>open").to_html(), "<div><p>open</p></div>");
    }

    #[test]
    fn test_unmatched_end_tag_ignored() {
        assert_eq!(Fragment::parse("a</span>b").to_html(), "ab");
    }

    #[test]
    fn test_end_tag_closes_intermediate() {
        assert_eq!(
            Fragment::parse("<p>a<div>b</p>c</div>").to_html(),
            "<p>a<div>b</div></p>c"
        );
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(Fragment::parse("a<br>b<hr/>c</br>").to_html(), "a<br>b<hr>c");
    }

    #[test]
    fn test_entities_decoded_and_reescaped() {
        let frag = Fragment::parse("Tom &amp; Jerry &lt;3 &nbsp;!");
        assert_eq!(frag.children, vec![Node::Text("Tom & Jerry <3 \u{a0}!".into())]);
        assert_eq!(frag.to_html(), "Tom &amp; Jerry &lt;3 \u{a0}!");
    }

    #[test]
    fn test_script_is_raw_text() {
        let frag = Fragment::parse("<script>if (a<b) { x = '</div>'; }</script>after");
        let Node::Element(script) = &frag.children[0] else {
            panic!("expected script element");
        };
        assert_eq!(script.children, vec![Node::Text("if (a<b) { x = '</div>'; }".into())]);
        assert_eq!(frag.children[1], Node::Text("after".into()));
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        assert_eq!(
            Fragment::parse("<!DOCTYPE html><!--[if mso]>x<![endif]--><p>k</p>").to_html(),
            "<p>k</p>"
        );
    }

    #[test]
    fn test_remove_unwrap_clear() {
        let mut frag = Fragment::parse(
            "<table class=\"t\"><tr><td style=\"x\">cell<img src=\"a.png\"></td></tr></table>",
        );
        frag.remove(&|el| el.name == "img");
        frag.unwrap_preserving_children(&|el| matches!(el.name.as_str(), "table" | "tr" | "td"));
        assert_eq!(frag.to_html(), "cell");

        let mut frag = Fragment::parse("<a href=\"u\" style=\"s\">link</a>");
        frag.clear_attributes();
        assert_eq!(frag.to_html(), "<a>link</a>");
    }

    #[test]
    fn test_nesting_is_bounded() {
        let html = "<div>".repeat(MAX_NESTING * 4) + "deep";
        let frag = Fragment::parse(&html);
        let mut depth = 0;
        let mut nodes = &frag.children;
        while let Some(Node::Element(el)) = nodes.first() {
            depth += 1;
            nodes = &el.children;
        }
        assert_eq!(depth, MAX_NESTING);
        assert_eq!(nodes.first(), Some(&Node::Text("deep".into())));
    }

    #[test]
    fn test_attribute_escaping() {
        let mut frag = Fragment::default();
        let mut el = Element::new("a");
        el.attrs.push(("title".into(), "say \"hi\" & <go>".into()));
        frag.children.push(Node::Element(el));
        assert_eq!(
            frag.to_html(),
            "<a title=\"say &quot;hi&quot; &amp; &lt;go&gt;\"></a>"
        );
    }
}
