// Tokens produced by the tokenizer and consumed, in order, by the
// parser.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Book,
    Chapter,
    Verse,
    Text,
    Paragraph,
    Character,
    Note,
    End,
    Milestone,
    MilestoneEnd,
    Unknown,
}

/// A `name="value"` pair captured from a `|` suffix, with the byte
/// offset of the value relative to the text token it was lexed from.
#[derive(Debug, Clone, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub offset: usize,
}

impl Attribute {
    pub fn new(name: &str, value: &str, offset: usize) -> Attribute {
        Attribute {
            name: name.to_owned(),
            value: value.to_owned(),
            offset,
        }
    }
}

// The offset is a lexical artifact; two attribute lists are the same
// when the names and values agree.
impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.name, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub marker: Option<String>,
    pub text: Option<String>,
    pub end_marker: Option<String>,
    pub data: Vec<String>,
    pub attributes: Vec<Attribute>,
}

impl Token {
    pub fn marker(kind: TokenKind, marker: &str, end_marker: Option<&str>) -> Token {
        Token {
            kind,
            marker: Some(marker.to_owned()),
            text: None,
            end_marker: end_marker.map(str::to_owned),
            data: vec![],
            attributes: vec![],
        }
    }

    pub fn with_data(kind: TokenKind, marker: &str, end_marker: Option<&str>, data: &str) -> Token {
        let mut token = Token::marker(kind, marker, end_marker);
        token
            .data
            .push(data.to_owned());
        token
    }

    pub fn text(text: String) -> Token {
        Token {
            kind: TokenKind::Text,
            marker: None,
            text: Some(text),
            end_marker: None,
            data: vec![],
            attributes: vec![],
        }
    }

    /// Marker with any nesting prefix removed: `+bd` reads as `bd`.
    pub fn nestless_marker(&self) -> Option<&str> {
        self.marker
            .as_deref()
            .map(|m| m.trim_start_matches('+'))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// The USFM fragment this token re-serializes to.
    ///
    /// WARNING: `length()` is defined as the length of this fragment;
    /// the verse offsets in diagnostics depend on the two agreeing.
    pub fn to_usfm(&self, add_spaces: bool) -> String {
        let marker = match &self.marker {
            Some(marker) => marker,
            None => {
                return self
                    .text
                    .clone()
                    .unwrap_or_default()
            }
        };

        let mut result = String::new();

        match self.kind {
            TokenKind::Milestone | TokenKind::MilestoneEnd => {
                result.push('\\');
                result.push_str(marker);
                if !self
                    .attributes
                    .is_empty()
                {
                    result.push('|');
                    result.push_str(&self.attribute_text());
                }
                result.push_str("\\*");
            }
            TokenKind::End => {
                // Attributes travel in front of the end marker, where
                // the source had them.
                if !self
                    .attributes
                    .is_empty()
                {
                    result.push('|');
                    result.push_str(&self.attribute_text());
                }
                result.push('\\');
                result.push_str(marker);
            }
            _ => {
                result.push('\\');
                result.push_str(marker);
                for item in &self.data {
                    result.push(' ');
                    result.push_str(item);
                }
                if add_spaces && !marker.ends_with('*') {
                    result.push(' ');
                }
            }
        }

        result
    }

    /// Displayed length of this token, used to advance the byte offset
    /// within the current verse.
    pub fn length(&self, add_spaces: bool) -> usize {
        self.to_usfm(add_spaces)
            .len()
    }

    pub fn attribute_text(&self) -> String {
        self.attributes
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Re-join a token sequence into USFM text.
pub fn join_usfm(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_usfm(true))
        .collect()
}

#[cfg(test)]
mod check {
    use super::*;

    #[test]
    fn fragment_lengths() {
        let token = Token::with_data(TokenKind::Verse, "v", None, "1");
        assert_eq!(token.to_usfm(true), "\\v 1 ");
        assert_eq!(token.length(true), 5);
        assert_eq!(token.to_usfm(false), "\\v 1");

        let token = Token::text("in the beginning ".to_owned());
        assert_eq!(token.length(true), 17);

        let token = Token::marker(TokenKind::End, "w*", None);
        assert_eq!(token.to_usfm(true), "\\w*");
    }

    #[test]
    fn attributes_compare_without_offsets() {
        let a = Attribute::new("lemma", "grace", 4);
        let b = Attribute::new("lemma", "grace", 9);
        assert_eq!(a, b);
    }
}
