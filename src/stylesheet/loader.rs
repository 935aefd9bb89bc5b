// Loader for marker stylesheets in the .sty line format.

use tracing::debug;

use crate::language::*;
use crate::stylesheet::MarkerCatalog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    UnknownField(usize, String),
    DuplicateField(usize, String),
    InvalidNumber(usize, String),
    InvalidAttributes(usize, String),
    MissingName(usize, String),
    MissingMilestoneEnd(usize, String),
    DuplicateMarker(usize, String),
    UnknownStyleType(usize, String),
    UnknownTextType(usize, String),
    UnknownJustification(usize, String),
    NoMarkers,
}

impl SheetError {
    pub fn line(&self) -> usize {
        match self {
            SheetError::UnknownField(line, _) => *line,
            SheetError::DuplicateField(line, _) => *line,
            SheetError::InvalidNumber(line, _) => *line,
            SheetError::InvalidAttributes(line, _) => *line,
            SheetError::MissingName(line, _) => *line,
            SheetError::MissingMilestoneEnd(line, _) => *line,
            SheetError::DuplicateMarker(line, _) => *line,
            SheetError::UnknownStyleType(line, _) => *line,
            SheetError::UnknownTextType(line, _) => *line,
            SheetError::UnknownJustification(line, _) => *line,
            SheetError::NoMarkers => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            SheetError::UnknownField(_, field) => {
                format!("unknown stylesheet field \\{}", field)
            }
            SheetError::DuplicateField(_, field) => {
                format!("field \\{} given more than once", field)
            }
            SheetError::InvalidNumber(_, value) => {
                format!("malformed number '{}'", value)
            }
            SheetError::InvalidAttributes(_, reason) => {
                format!("malformed attribute specification: {}", reason)
            }
            SheetError::MissingName(_, marker) => {
                format!("marker {} has no \\Name", marker)
            }
            SheetError::MissingMilestoneEnd(_, marker) => {
                format!("milestone {} has no \\Endmarker", marker)
            }
            SheetError::DuplicateMarker(_, marker) => {
                format!("marker {} defined more than once", marker)
            }
            SheetError::UnknownStyleType(_, value) => {
                format!("unknown style type '{}'", value)
            }
            SheetError::UnknownTextType(_, value) => {
                format!("unknown text type '{}'", value)
            }
            SheetError::UnknownJustification(_, value) => {
                format!("unknown justification '{}'", value)
            }
            SheetError::NoMarkers => "no \\Marker entries in stylesheet".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub catalog: MarkerCatalog,
    pub errors: Vec<SheetError>,
}

/// One pre-processed stylesheet line: field name lowercased, the rest
/// of the line, and the one-origin line number.
#[derive(Debug)]
struct Entry<'i> {
    field: String,
    value: &'i str,
    line: usize,
}

pub fn parse_stylesheet(content: &str) -> Stylesheet {
    parse_stylesheet_with(content, &|_| 0)
}

/// Parse a stylesheet, resolving `\ColorName` lines through the given
/// theme hook.
pub fn parse_stylesheet_with(content: &str, theme: &dyn Fn(&str) -> u32) -> Stylesheet {
    let entries = preprocess(content);
    let mut catalog = MarkerCatalog::new();
    let mut errors = vec![];
    let mut defined: Vec<String> = vec![];

    // Group entries into runs, one per \Marker line
    let starts: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.field == "marker")
        .map(|(i, _)| i)
        .collect();

    if starts.is_empty() {
        if !entries.is_empty() || !content
            .trim()
            .is_empty()
        {
            errors.push(SheetError::NoMarkers);
        }
        return Stylesheet { catalog, errors };
    }

    for (n, &start) in starts
        .iter()
        .enumerate()
    {
        let end = starts
            .get(n + 1)
            .copied()
            .unwrap_or(entries.len());
        let header = &entries[start];

        let mut words = header
            .value
            .split_whitespace();
        let tag = match words.next() {
            Some(tag) => tag.to_lowercase(),
            None => continue,
        };

        // \Marker xy - deletes the marker and its end counterpart
        if words.next() == Some("-") {
            debug!(marker = tag.as_str(), "stylesheet removal");
            catalog.remove(&tag);
            defined.retain(|m| *m != tag);
            continue;
        }

        if defined.contains(&tag) {
            errors.push(SheetError::DuplicateMarker(header.line, format!("\\{}", tag)));
        }
        defined.push(tag.clone());

        let style = assemble(&tag, header, &entries[start + 1..end], theme, &mut errors);

        // Explicit or defaulted end markers get their own entry so the
        // tokenizer can classify them.
        match style.style_type {
            StyleType::Milestone => {
                if let Some(end_tag) = &style.end_marker {
                    let mut end_style = MarkerStyle::new(end_tag);
                    end_style.style_type = StyleType::MilestoneEnd;
                    end_style.name = style
                        .name
                        .clone();
                    end_style
                        .set_attributes("?id")
                        .expect("the synthesized id attribute is well-formed");
                    catalog.add(end_style);
                }
            }
            StyleType::Character | StyleType::Note => {
                if let Some(end_tag) = &style.end_marker {
                    let mut end_style = MarkerStyle::new(end_tag);
                    end_style.style_type = StyleType::End;
                    end_style.name = style
                        .name
                        .clone();
                    catalog.add(end_style);
                }
            }
            _ => {}
        }

        catalog.add(style);
    }

    Stylesheet { catalog, errors }
}

fn preprocess(content: &str) -> Vec<Entry<'_>> {
    let mut entries = vec![];

    for (i, raw) in content
        .lines()
        .enumerate()
    {
        // USFM-3 compatibility prefix, then comments, then whitespace
        let line = raw
            .strip_prefix("#!")
            .unwrap_or(raw);
        let line = match line.find('#') {
            Some(p) => &line[..p],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let rest = match line.strip_prefix('\\') {
            Some(rest) => rest,
            None => continue,
        };

        let (field, value) = match rest.find(char::is_whitespace) {
            Some(p) => (&rest[..p], rest[p..].trim()),
            None => (rest, ""),
        };

        entries.push(Entry {
            field: field.to_lowercase(),
            value,
            line: i + 1,
        });
    }

    entries
}

fn assemble(
    tag: &str,
    header: &Entry,
    body: &[Entry],
    theme: &dyn Fn(&str) -> u32,
    errors: &mut Vec<SheetError>,
) -> MarkerStyle {
    let mut style = MarkerStyle::new(tag);
    let mut seen: Vec<&str> = vec![];

    for entry in body {
        if seen.contains(
            &entry
                .field
                .as_str(),
        ) {
            errors.push(SheetError::DuplicateField(
                entry.line,
                entry
                    .field
                    .clone(),
            ));
            continue;
        }

        match entry
            .field
            .as_str()
        {
            "name" => style.name = Some(entry.value.to_owned()),
            "description" => style.description = Some(entry.value.to_owned()),
            "fontname" => style.font_name = Some(entry.value.to_owned()),
            "xmltag" => style.xml_tag = Some(entry.value.to_owned()),
            "encoding" => style.encoding = Some(entry.value.to_owned()),
            "occursunder" => {
                style.occurs_under = entry
                    .value
                    .split_whitespace()
                    .map(str::to_owned)
                    .collect()
            }
            "fontsize" => decode_integer(entry, &mut style.font_size, errors),
            "linespacing" => decode_integer(entry, &mut style.line_spacing, errors),
            "spacebefore" => decode_integer(entry, &mut style.space_before, errors),
            "spaceafter" => decode_integer(entry, &mut style.space_after, errors),
            "rank" => decode_integer(entry, &mut style.rank, errors),
            "leftmargin" => decode_margin(entry, &mut style.left_margin, errors),
            "rightmargin" => decode_margin(entry, &mut style.right_margin, errors),
            "firstlineindent" => decode_margin(entry, &mut style.first_line_indent, errors),
            "bold" => style.bold = entry.value != "-",
            "italic" => style.italic = entry.value != "-",
            "smallcaps" => style.small_caps = entry.value != "-",
            "subscript" => style.subscript = entry.value != "-",
            "superscript" => style.superscript = entry.value != "-",
            "underline" => style.underline = entry.value != "-",
            "notrepeatable" => style.not_repeatable = entry.value != "-",
            "regular" => {
                style.bold = false;
                style.italic = false;
                style.superscript = false;
                style.regular = true;
            }
            "color" => decode_color(entry, &mut style.color, errors),
            "colorname" => style.color = theme(entry.value),
            "justification" => {
                match entry
                    .value
                    .to_lowercase()
                    .as_str()
                {
                    "left" => style.justification = Justification::Left,
                    "center" => style.justification = Justification::Center,
                    "right" => style.justification = Justification::Right,
                    "both" => style.justification = Justification::Both,
                    other => {
                        errors.push(SheetError::UnknownJustification(entry.line, other.to_owned()))
                    }
                }
            }
            "styletype" => {
                match entry
                    .value
                    .to_lowercase()
                    .as_str()
                {
                    "character" => style.style_type = StyleType::Character,
                    "paragraph" => style.style_type = StyleType::Paragraph,
                    "note" => style.style_type = StyleType::Note,
                    "milestone" => style.style_type = StyleType::Milestone,
                    other => {
                        errors.push(SheetError::UnknownStyleType(entry.line, other.to_owned()))
                    }
                }
            }
            "texttype" => decode_text_type(entry, &mut style, errors),
            "textproperties" => decode_properties(entry, &mut style),
            "attributes" => {
                if let Err(error) = style.set_attributes(entry.value) {
                    errors.push(SheetError::InvalidAttributes(
                        entry.line,
                        error
                            .message()
                            .to_owned(),
                    ));
                }
            }
            "endmarker" => style.end_marker = Some(entry.value.to_owned()),
            other => errors.push(SheetError::UnknownField(entry.line, other.to_owned())),
        }

        seen.push(
            entry
                .field
                .as_str(),
        );
    }

    finalize(tag, header, &mut style, errors);
    style
}

fn finalize(tag: &str, header: &Entry, style: &mut MarkerStyle, errors: &mut Vec<SheetError>) {
    if style
        .name
        .is_none()
    {
        errors.push(SheetError::MissingName(header.line, format!("\\{}", tag)));
    }

    // The book identification line is a book property by definition
    if tag == "id" {
        style.properties |= TextProperties::BOOK;
    }

    match style.style_type {
        StyleType::Character => {
            if style
                .end_marker
                .is_none()
            {
                style.end_marker = Some(format!("{}*", tag));
            }
        }
        StyleType::Milestone => {
            if style
                .end_marker
                .is_none()
            {
                errors.push(SheetError::MissingMilestoneEnd(
                    header.line,
                    format!("\\{}", tag),
                ));
            }
        }
        _ => {}
    }

    if style.text_type == TextType::Other
        && matches!(
            style.style_type,
            StyleType::Character | StyleType::Paragraph
        )
        && !style
            .properties
            .intersects(
                TextProperties::NONPUBLISHABLE | TextProperties::CHAPTER | TextProperties::VERSE,
            )
    {
        style.properties |= TextProperties::PUBLISHABLE;
    }
}

fn decode_integer(entry: &Entry, slot: &mut u32, errors: &mut Vec<SheetError>) {
    if entry.value == "-" {
        *slot = 0;
        return;
    }
    match entry
        .value
        .parse::<u32>()
    {
        Ok(n) => *slot = n,
        Err(_) => errors.push(SheetError::InvalidNumber(
            entry.line,
            entry
                .value
                .to_owned(),
        )),
    }
}

// Margins are declared in (fractional) points; stored in thousandths
fn decode_margin(entry: &Entry, slot: &mut i32, errors: &mut Vec<SheetError>) {
    if entry.value == "-" {
        *slot = 0;
        return;
    }
    match entry
        .value
        .parse::<f64>()
    {
        Ok(x) => *slot = (x * 1000.0).round() as i32,
        Err(_) => errors.push(SheetError::InvalidNumber(
            entry.line,
            entry
                .value
                .to_owned(),
        )),
    }
}

fn decode_color(entry: &Entry, slot: &mut u32, errors: &mut Vec<SheetError>) {
    let value = entry.value;
    if value == "-" {
        *slot = 0;
        return;
    }

    if let Some(hex) = value
        .strip_prefix('x')
        .or_else(|| value.strip_prefix('X'))
    {
        match u32::from_str_radix(hex, 16) {
            Ok(rgb) => *slot = rgb,
            Err(_) => errors.push(SheetError::InvalidNumber(entry.line, value.to_owned())),
        }
        return;
    }

    // Decimal colors arrive in BGR order; swap the end bytes
    match value.parse::<u32>() {
        Ok(bgr) => *slot = ((bgr & 0xFF) << 16) | (bgr & 0xFF00) | ((bgr >> 16) & 0xFF),
        Err(_) => errors.push(SheetError::InvalidNumber(entry.line, value.to_owned())),
    }
}

fn decode_text_type(entry: &Entry, style: &mut MarkerStyle, errors: &mut Vec<SheetError>) {
    match entry
        .value
        .to_lowercase()
        .as_str()
    {
        "title" => style.text_type = TextType::Title,
        "section" => style.text_type = TextType::Section,
        "versetext" => style.text_type = TextType::VerseText,
        "notetext" => style.text_type = TextType::NoteText,
        "other" => style.text_type = TextType::Other,
        "backtranslation" => style.text_type = TextType::BackTranslation,
        "translationnote" => style.text_type = TextType::TranslationNote,
        "unspecified" => style.text_type = TextType::Unspecified,
        // Chapter and verse number lines double as property markers
        "chapternumber" => {
            style.text_type = TextType::Other;
            style.properties |= TextProperties::CHAPTER;
        }
        "versenumber" => {
            style.text_type = TextType::Other;
            style.properties |= TextProperties::VERSE;
        }
        other => errors.push(SheetError::UnknownTextType(entry.line, other.to_owned())),
    }
}

fn decode_properties(entry: &Entry, style: &mut MarkerStyle) {
    for word in entry
        .value
        .split_whitespace()
    {
        let bit = match word
            .to_lowercase()
            .as_str()
        {
            "verse" => TextProperties::VERSE,
            "chapter" => TextProperties::CHAPTER,
            "paragraph" => TextProperties::PARAGRAPH,
            "publishable" => TextProperties::PUBLISHABLE,
            "vernacular" => TextProperties::VERNACULAR,
            "poetic" => TextProperties::POETIC,
            "level_1" | "level1" => TextProperties::LEVEL_1,
            "level_2" | "level2" => TextProperties::LEVEL_2,
            "level_3" | "level3" => TextProperties::LEVEL_3,
            "level_4" | "level4" => TextProperties::LEVEL_4,
            "level_5" | "level5" => TextProperties::LEVEL_5,
            "crossreference" => TextProperties::CROSS_REFERENCE,
            "nonpublishable" => TextProperties::NONPUBLISHABLE,
            "nonvernacular" => TextProperties::NONVERNACULAR,
            "book" => TextProperties::BOOK,
            "note" => TextProperties::NOTE,
            _ => continue,
        };
        style.properties |= bit;
    }

    // Being declared non-publishable beats the publishable default
    if style
        .properties
        .contains(TextProperties::NONPUBLISHABLE)
    {
        style
            .properties
            .remove(TextProperties::PUBLISHABLE);
    }
}
