// Marker descriptors as declared by a stylesheet. These are the
// catalog entries the tokenizer and parser consult to classify markers.

use bitflags::bitflags;

/// Parse behavior class of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleType {
    Character,
    Paragraph,
    Note,
    Milestone,
    MilestoneEnd,
    End,
    Unknown,
}

/// Kind of text a marker introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Unspecified,
    Title,
    Section,
    VerseText,
    NoteText,
    Other,
    BackTranslation,
    TranslationNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Center,
    Right,
    Both,
}

bitflags! {
    /// Property bits a stylesheet can attach to a marker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextProperties: u32 {
        const VERSE = 1 << 0;
        const CHAPTER = 1 << 1;
        const PARAGRAPH = 1 << 2;
        const PUBLISHABLE = 1 << 3;
        const VERNACULAR = 1 << 4;
        const POETIC = 1 << 5;
        const LEVEL_1 = 1 << 6;
        const LEVEL_2 = 1 << 7;
        const LEVEL_3 = 1 << 8;
        const LEVEL_4 = 1 << 9;
        const LEVEL_5 = 1 << 10;
        const CROSS_REFERENCE = 1 << 11;
        const NONPUBLISHABLE = 1 << 12;
        const NONVERNACULAR = 1 << 13;
        const BOOK = 1 << 14;
        const NOTE = 1 << 15;
    }
}

/// One declared attribute: its name and whether a value must be given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: String,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSpecError {
    Empty,
    RequiredAfterOptional,
}

impl AttributeSpecError {
    pub fn message(&self) -> &'static str {
        match self {
            AttributeSpecError::Empty => "attribute specification is empty",
            AttributeSpecError::RequiredAfterOptional => {
                "required attributes must precede optional ones"
            }
        }
    }
}

/// Everything the stylesheet says about one marker. Cosmetic fields are
/// carried through but not interpreted by the checks.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub marker: String,
    pub style_type: StyleType,
    pub end_marker: Option<String>,
    pub text_type: TextType,
    pub properties: TextProperties,
    pub occurs_under: Vec<String>,
    pub rank: u32,
    pub attributes: Vec<AttributeSpec>,
    pub default_attribute: Option<String>,

    pub name: Option<String>,
    pub description: Option<String>,
    pub font_name: Option<String>,
    pub xml_tag: Option<String>,
    pub encoding: Option<String>,
    pub font_size: u32,
    pub line_spacing: u32,
    pub space_before: u32,
    pub space_after: u32,
    pub left_margin: i32,
    pub right_margin: i32,
    pub first_line_indent: i32,
    pub bold: bool,
    pub italic: bool,
    pub small_caps: bool,
    pub subscript: bool,
    pub superscript: bool,
    pub underline: bool,
    pub regular: bool,
    pub not_repeatable: bool,
    pub color: u32,
    pub justification: Justification,
}

impl MarkerStyle {
    pub fn new(marker: &str) -> MarkerStyle {
        // Chapter and verse number runs are not part of the published
        // text; everything else starts out publishable.
        let properties = if marker == "c" || marker == "v" {
            TextProperties::empty()
        } else {
            TextProperties::PUBLISHABLE
        };

        MarkerStyle {
            marker: marker.to_owned(),
            style_type: StyleType::Unknown,
            end_marker: None,
            text_type: TextType::Unspecified,
            properties,
            occurs_under: vec![],
            rank: 0,
            attributes: vec![],
            default_attribute: None,
            name: None,
            description: None,
            font_name: None,
            xml_tag: None,
            encoding: None,
            font_size: 0,
            line_spacing: 0,
            space_before: 0,
            space_after: 0,
            left_margin: 0,
            right_margin: 0,
            first_line_indent: 0,
            bold: false,
            italic: false,
            small_caps: false,
            subscript: false,
            superscript: false,
            underline: false,
            regular: false,
            not_repeatable: false,
            color: 0,
            justification: Justification::Left,
        }
    }

    /// Descriptor synthesized for a marker the stylesheet never
    /// declared. Rendered red so it stands out in an editor.
    pub fn unknown(marker: &str) -> MarkerStyle {
        let mut style = MarkerStyle::new(marker);
        style.style_type = StyleType::Unknown;
        style.color = 0xFF0000;
        style
    }

    /// Decode a raw attribute specification: whitespace-separated
    /// names, a leading '?' marking a name optional. All required
    /// names must come first. Also derives the default attribute.
    pub fn set_attributes(&mut self, spec: &str) -> Result<(), AttributeSpecError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(AttributeSpecError::Empty);
        }

        let mut attributes = vec![];
        let mut seen_optional = false;
        for word in spec.split_whitespace() {
            let (name, required) = match word.strip_prefix('?') {
                Some(rest) => (rest, false),
                None => (word, true),
            };
            if name.is_empty() {
                return Err(AttributeSpecError::Empty);
            }
            if required && seen_optional {
                return Err(AttributeSpecError::RequiredAfterOptional);
            }
            seen_optional = seen_optional || !required;
            attributes.push(AttributeSpec {
                name: name.to_owned(),
                required,
            });
        }

        // A bare value can only stand in for one attribute, so the
        // default exists only while at most one is required.
        let required = attributes
            .iter()
            .filter(|a| a.required)
            .count();
        self.default_attribute = if required <= 1 {
            attributes
                .first()
                .map(|a| a.name.clone())
        } else {
            None
        };

        self.attributes = attributes;
        Ok(())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.name == name)
    }
}
