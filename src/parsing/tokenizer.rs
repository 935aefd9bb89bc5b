// Tokenizer: turns raw USFM text into a typed token sequence, with
// attribute suffixes resolved onto the tokens that own them.

use crate::language::*;
use crate::stylesheet::MarkerCatalog;

/// A character the tokenizer may collapse or consume. U+3000 is
/// meaningful in CJK text and the zero-width joiners shape glyphs, so
/// none of those count; the zero-width space does.
pub fn is_nonsemantic_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{3000}') || c == '\u{200B}'
}

/// Tokenize a book of USFM. Unknown markers are added to the catalog
/// as they are met, so the catalog is borrowed mutably for the call.
pub fn tokenize(catalog: &mut MarkerCatalog, text: &str, preserve_whitespace: bool) -> Vec<Token> {
    let mut tokens: Vec<Token> = vec![];
    let mut index = 0;
    // Most recent character-style opener that captured attributes; its
    // end marker will receive them.
    let mut attribute_opener: Option<usize> = None;

    while index < text.len() {
        if !text[index..].starts_with('\\') {
            let next_marker = text[index..]
                .find('\\')
                .map(|p| index + p)
                .unwrap_or(text.len());
            let mut piece = text[index..next_marker].to_owned();
            if !preserve_whitespace {
                piece = regularize_spaces(&piece);
            }
            attribute_opener = handle_attributes(catalog, &mut tokens, attribute_opener, &mut piece);
            tokens.push(Token::text(piece));
            index = next_marker;
            continue;
        }

        // Scan the marker. A trailing '*' belongs to it; '\', '|' and
        // non-semantic whitespace end it.
        index += 1;
        let marker_start = index;
        let mut marker_end = text.len();
        let mut after = text.len();
        for (off, c) in text[marker_start..].char_indices() {
            let pos = marker_start + off;
            if c == '\\' || c == '|' {
                marker_end = pos;
                after = pos;
                break;
            }
            if c == '*' {
                marker_end = pos + 1;
                after = pos + 1;
                break;
            }
            if is_nonsemantic_whitespace(c) {
                marker_end = pos;
                after = if preserve_whitespace {
                    pos
                } else {
                    pos + c.len_utf8()
                };
                break;
            }
        }
        let marker = text[marker_start..marker_end].to_owned();
        index = after;

        if !preserve_whitespace && !marker.ends_with('*') {
            index = skip_whitespace(text, index);
        }

        // A bare * closes the milestone it follows; it stands for the
        // \* terminator and produces no token of its own.
        if marker == "*" {
            if tokens.len() >= 2
                && is_space_only_text(
                    tokens
                        .last()
                        .unwrap(),
                )
                && matches!(
                    tokens[tokens.len() - 2].kind,
                    TokenKind::Milestone | TokenKind::MilestoneEnd
                )
            {
                tokens.pop();
            }
            if matches!(
                tokens
                    .last()
                    .map(|t| t.kind),
                Some(TokenKind::Milestone) | Some(TokenKind::MilestoneEnd)
            ) {
                continue;
            }
        }

        // Classify via the catalog. A + prefix marks a nested
        // character style; on anything else the full tag is looked up.
        let bare = marker.trim_start_matches('+');
        let mut style = catalog
            .get_or_add(bare)
            .clone();
        if marker.starts_with('+')
            && !matches!(style.style_type, StyleType::Character | StyleType::End)
        {
            style = catalog
                .get_or_add(&marker)
                .clone();
        }

        match style.style_type {
            StyleType::Character => {
                if style
                    .properties
                    .contains(TextProperties::VERSE)
                {
                    let number = next_word(text, &mut index, preserve_whitespace);
                    tokens.push(Token::with_data(TokenKind::Verse, &marker, None, &number));
                } else {
                    let end = format!("{}*", marker);
                    tokens.push(Token::marker(
                        TokenKind::Character,
                        &marker,
                        Some(end.as_str()),
                    ));
                }
            }
            StyleType::Paragraph => {
                if style
                    .properties
                    .contains(TextProperties::CHAPTER)
                {
                    let number = next_word(text, &mut index, preserve_whitespace);
                    tokens.push(Token::with_data(TokenKind::Chapter, &marker, None, &number));
                } else if style
                    .properties
                    .contains(TextProperties::BOOK)
                {
                    let code = next_word(text, &mut index, preserve_whitespace);
                    tokens.push(Token::with_data(TokenKind::Book, &marker, None, &code));
                } else {
                    tokens.push(Token::marker(
                        TokenKind::Paragraph,
                        &marker,
                        style
                            .end_marker
                            .as_deref(),
                    ));
                }
            }
            StyleType::Note => {
                let caller = next_word(text, &mut index, preserve_whitespace);
                tokens.push(Token::with_data(
                    TokenKind::Note,
                    &marker,
                    style
                        .end_marker
                        .as_deref(),
                    &caller,
                ));
            }
            StyleType::End => {
                push_end_token(&mut tokens, &marker, &mut attribute_opener);
            }
            StyleType::Milestone | StyleType::MilestoneEnd => {
                // Without the \* terminator ahead of the next marker
                // this is treated as plain text, which keeps partially
                // typed milestones editable.
                let next_slash = text[index..]
                    .find('\\')
                    .map(|p| index + p)
                    .unwrap_or(text.len());
                if text[next_slash..].starts_with("\\*") {
                    let kind = if style.style_type == StyleType::Milestone {
                        TokenKind::Milestone
                    } else {
                        TokenKind::MilestoneEnd
                    };
                    tokens.push(Token::marker(
                        kind,
                        &marker,
                        style
                            .end_marker
                            .as_deref(),
                    ));
                } else {
                    let mut literal = format!("\\{}{}", marker, &text[index..next_slash]);
                    if !preserve_whitespace {
                        literal = regularize_spaces(&literal);
                    }
                    tokens.push(Token::text(literal));
                    index = next_slash;
                }
            }
            StyleType::Unknown => {
                if marker.ends_with('*') {
                    push_end_token(&mut tokens, &marker, &mut attribute_opener);
                } else if marker == "esb" || marker == "esbe" {
                    // Sidebars behave as paragraphs even when the
                    // stylesheet does not know them
                    tokens.push(Token::marker(
                        TokenKind::Paragraph,
                        &marker,
                        style
                            .end_marker
                            .as_deref(),
                    ));
                } else {
                    let end = format!("{}*", marker);
                    tokens.push(Token::marker(TokenKind::Unknown, &marker, Some(end.as_str())));
                }
            }
        }
    }

    // Force a trailing space before structural markers so that
    // re-joining the tokens round-trips.
    if !preserve_whitespace {
        for i in 1..tokens.len() {
            let needs_space = match tokens[i].kind {
                TokenKind::Book | TokenKind::Chapter | TokenKind::Paragraph => true,
                TokenKind::Verse => !matches!(
                    tokens[i - 1]
                        .text
                        .as_deref()
                        .and_then(|t| t.chars().last()),
                    Some('(') | Some('[')
                ),
                _ => false,
            };
            if needs_space && tokens[i - 1].kind == TokenKind::Text {
                let text = tokens[i - 1]
                    .text
                    .as_mut()
                    .expect("text tokens carry text");
                if !text.ends_with(' ') {
                    text.push(' ');
                }
            }
        }
    }

    tokens
}

fn push_end_token(tokens: &mut Vec<Token>, marker: &str, attribute_opener: &mut Option<usize>) {
    let mut token = Token::marker(TokenKind::End, marker, None);
    if let Some(i) = *attribute_opener {
        if tokens[i]
            .end_marker
            .as_deref()
            == Some(marker)
        {
            token.attributes = tokens[i]
                .attributes
                .clone();
            *attribute_opener = None;
        }
    }
    tokens.push(token);
}

fn is_space_only_text(token: &Token) -> bool {
    token.kind == TokenKind::Text
        && token
            .text
            .as_deref()
            .map(|t| {
                t.trim()
                    .is_empty()
            })
            .unwrap_or(false)
}

fn skip_whitespace(text: &str, mut index: usize) -> usize {
    while let Some(c) = text[index..]
        .chars()
        .next()
    {
        if is_nonsemantic_whitespace(c) {
            index += c.len_utf8();
        } else {
            break;
        }
    }
    index
}

/// Take the word following a marker (book code, chapter or verse
/// number, note caller). Words end at whitespace or the next marker.
fn next_word(text: &str, index: &mut usize, preserve_whitespace: bool) -> String {
    *index = skip_whitespace(text, *index);

    let start = *index;
    while let Some(c) = text[*index..]
        .chars()
        .next()
    {
        if is_nonsemantic_whitespace(c) || c == '\\' {
            break;
        }
        *index += c.len_utf8();
    }
    let word = text[start..*index].to_owned();

    if !preserve_whitespace {
        *index = skip_whitespace(text, *index);
    }

    word
}

/// Collapse runs of non-semantic whitespace to single spaces. Control
/// characters count as whitespace; a zero-width space directly before
/// other whitespace is dropped outright.
fn regularize_spaces(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut was_space = false;
    let chars: Vec<char> = text
        .chars()
        .collect();

    for (i, &c) in chars
        .iter()
        .enumerate()
    {
        if (c as u32) < 32 {
            if !was_space {
                result.push(' ');
            }
            was_space = true;
        } else if !was_space
            && c == '\u{200B}'
            && chars
                .get(i + 1)
                .map(|&next| is_nonsemantic_whitespace(next))
                .unwrap_or(false)
        {
            // redundant zero-width space
        } else if is_nonsemantic_whitespace(c) {
            if !was_space {
                result.push(' ');
            }
            was_space = true;
        } else {
            result.push(c);
            was_space = false;
        }
    }

    result
}

/// Attach a `|`-suffix in a text run to the character style or
/// milestone it belongs to. Returns the opener whose end marker should
/// inherit the attributes, if any.
fn handle_attributes(
    catalog: &mut MarkerCatalog,
    tokens: &mut Vec<Token>,
    attribute_opener: Option<usize>,
    text: &mut String,
) -> Option<usize> {
    let pipe = match text.find('|') {
        Some(p) => p,
        None => return attribute_opener,
    };
    let opener = match find_matching_start(tokens) {
        Some(i) => i,
        None => return attribute_opener,
    };

    let marker = tokens[opener]
        .nestless_marker()
        .unwrap_or_default()
        .to_owned();
    let style = catalog
        .get_or_add(&marker)
        .clone();
    if !matches!(
        style.style_type,
        StyleType::Character | StyleType::Milestone | StyleType::MilestoneEnd
    ) {
        return attribute_opener;
    }

    let spec = text[pipe + 1..].to_owned();
    let mut adjusted = text[..pipe].to_owned();

    if marker == "fig"
        && spec
            .matches('|')
            .count()
            == 5
    {
        // Legacy figure layout: positional fields, the caption in the
        // middle, and the running text becomes the alt description.
        let parts: Vec<&str> = spec
            .split('|')
            .collect();
        let attributes = vec![
            Attribute::new("alt", &adjusted, 0),
            Attribute::new("src", parts[0], 0),
            Attribute::new("size", parts[1], 0),
            Attribute::new("loc", parts[2], 0),
            Attribute::new("copy", parts[3], 0),
            Attribute::new("ref", parts[5], 0),
        ];
        adjusted = parts[4].to_owned();
        tokens[opener].attributes = attributes;
    } else {
        match parse_attributes(&spec, style.default_attribute.as_deref(), pipe + 1) {
            Some(attributes) => tokens[opener].attributes = attributes,
            // Not a well-formed specification; the | stays literal
            None => return attribute_opener,
        }
    }

    *text = adjusted;

    if style.style_type == StyleType::Character {
        Some(opener)
    } else {
        // milestones terminate with \*; nothing inherits
        attribute_opener
    }
}

/// Parse `name="value"` pairs, or a single bare value when the marker
/// declares a default attribute. The whole specification must be
/// consumed or no attributes are produced.
fn parse_attributes(spec: &str, default: Option<&str>, base: usize) -> Option<Vec<Attribute>> {
    if spec.is_empty() {
        return None;
    }

    if !spec.contains('=') {
        let default = default?;
        return Some(vec![Attribute::new(default, spec.trim(), base)]);
    }

    let re = regex!(r#"([-\w]+)\s*=\s*"(.*?)"\s*"#);
    let mut attributes = vec![];
    let mut consumed = 0;
    for cap in re.captures_iter(spec) {
        let all = cap.get(0)?;
        if all.start() != consumed {
            return None;
        }
        consumed = all.end();
        let name = cap.get(1)?;
        let value = cap.get(2)?;
        attributes.push(Attribute::new(
            name.as_str(),
            value.as_str(),
            base + value.start(),
        ));
    }
    if consumed != spec.len() || attributes.is_empty() {
        return None;
    }

    Some(attributes)
}

/// Innermost opener (character style, milestone, note or unknown) that
/// has not been closed yet, scanning backwards over the tokens so far.
fn find_matching_start(tokens: &[Token]) -> Option<usize> {
    let mut expected_ends: Vec<String> = vec![];

    for i in (0..tokens.len()).rev() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::Text => continue,
            TokenKind::End => {
                expected_ends.push(
                    token
                        .marker
                        .clone()
                        .unwrap_or_default(),
                );
            }
            TokenKind::Character
            | TokenKind::Milestone
            | TokenKind::MilestoneEnd
            | TokenKind::Note
            | TokenKind::Unknown => {
                if let Some(end) = token
                    .end_marker
                    .as_deref()
                {
                    if expected_ends
                        .last()
                        .map(String::as_str)
                        == Some(end)
                    {
                        expected_ends.pop();
                        continue;
                    }
                }
                if expected_ends.is_empty() {
                    return Some(i);
                }
            }
            // paragraph-level structure bounds the search
            _ => return None,
        }
    }

    None
}
