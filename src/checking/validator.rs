// The validating sink: drives every structural check over the events
// the parser fires, accumulating diagnostics.

use tracing::debug;

use crate::checking::messages;
use crate::checking::{segment, Diagnostic, ParaStack, Severity, Subject};
use crate::language::*;
use crate::parsing::{tokenize, CellAlign, ElementKind, ParserSink, ParserState, UsfmParser};
use crate::stylesheet::MarkerCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsfmVersion {
    Two,
    Three,
}

pub type Translator = fn(&str) -> String;

fn identity(key: &str) -> String {
    key.to_owned()
}

// Markers that legitimately carry no text
const EMPTY_ALLOWED: &[&str] = &["b", "ib", "ie", "pb", "tc", "xt"];

// Character styles suspicious when closed and immediately reopened
const REPEAT_SUSPECTS: &[&str] = &["qt", "wj", "no", "it", "bd", "bdit", "em", "sc", "add"];

// Linking attributes are valid on any character style
const LINK_ATTRIBUTES: &[&str] = &["link-href", "link-title", "link-name"];

const FIGURE_ATTRIBUTES: &[&str] = &["alt", "src", "size", "loc", "copy", "ref"];

/// An open character style or note, as this sink tracks it.
struct Span {
    marker: String,
    has_text: bool,
    text: String,
    attributes: Vec<Attribute>,
}

struct OpenMilestone {
    marker: String,
    end: String,
    id: Option<String>,
}

pub struct MarkerCheck<'s> {
    catalog: &'s MarkerCatalog,
    version: UsfmVersion,
    translate: Translator,
    book: String,
    chapter: u32,
    verse: u32,
    offset: usize,
    diagnostics: Vec<Diagnostic>,
    para_stack: ParaStack,
    expected_cell: u32,
    last_closed_char: Option<String>,
    spans: Vec<Span>,
    para_content: bool,
    milestones: Vec<OpenMilestone>,
    // index of the last verse-without-paragraph diagnostic, for
    // folding consecutive offenders into a range
    orphan_verse: Option<usize>,
}

impl<'s> MarkerCheck<'s> {
    pub fn new(catalog: &'s MarkerCatalog, book: &str, version: UsfmVersion) -> MarkerCheck<'s> {
        MarkerCheck {
            catalog,
            version,
            translate: identity,
            book: book.to_owned(),
            chapter: 1,
            verse: 0,
            offset: 0,
            diagnostics: vec![],
            para_stack: ParaStack::new(),
            expected_cell: 1,
            last_closed_char: None,
            spans: vec![],
            para_content: false,
            milestones: vec![],
            orphan_verse: None,
        }
    }

    pub fn with_translator(mut self, translate: Translator) -> MarkerCheck<'s> {
        self.translate = translate;
        self
    }

    pub fn finish(mut self) -> Vec<Diagnostic> {
        let open: Vec<String> = self
            .milestones
            .drain(..)
            .map(|m| m.marker)
            .collect();
        for marker in open {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::MISSING_MILESTONE_END,
                Some(&tagged),
            );
        }
        self.diagnostics
    }

    fn sync(&mut self, state: &ParserState) {
        self.chapter = state
            .verse
            .chapter;
        self.verse = state
            .verse
            .verse;
        self.offset = state.verse_offset;
    }

    fn report(&mut self, subject: Subject, key: &str, suffix: Option<&str>, severity: Severity) {
        let mut message = (self.translate)(key);
        if let Some(suffix) = suffix {
            message.push_str(": ");
            message.push_str(suffix);
        }
        self.diagnostics
            .push(Diagnostic {
                reference: VerseRef {
                    book: self
                        .book
                        .clone(),
                    chapter: self.chapter,
                    verse: self.verse,
                },
                verse_end: None,
                offset: self.offset,
                subject,
                message,
                severity,
            });
    }

    fn error(&mut self, subject: Subject, key: &str, suffix: Option<&str>) {
        self.report(subject, key, suffix, Severity::Error);
    }

    fn warning(&mut self, subject: Subject, key: &str, suffix: Option<&str>) {
        self.report(subject, key, suffix, Severity::Warning);
    }

    fn style_for(&self, marker: &str) -> MarkerStyle {
        let bare = marker.trim_start_matches('+');
        self.catalog
            .get(bare)
            .cloned()
            .unwrap_or_else(|| MarkerStyle::unknown(bare))
    }

    /// The first token of a book must be its \id line.
    pub fn check_first_marker(&mut self, tokens: &[Token]) {
        let first = tokens
            .first()
            .and_then(|t| {
                t.marker
                    .as_deref()
            });
        if first != Some("id") {
            self.error(
                Subject::Marker("\\id".to_owned()),
                messages::MISSING_ID,
                None,
            );
        }
    }

    /// Textual pre-pass: a non-space character butted directly against
    /// a marker backslash. End markers close spans in place, so they
    /// are exempt.
    pub fn check_marker_spacing(&mut self, text: &str) {
        let re = regex!(r"([^\s\\])\\([A-Za-z0-9+-]+\*?)");
        for cap in re.captures_iter(text) {
            let marker = cap
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or_default();
            if marker.ends_with('*') {
                continue;
            }
            let whole = cap
                .get(0)
                .expect("capture 0 is the whole match");

            // Attribute the finding to the chapter it falls in
            let mut chapter = 1;
            let mut chapter_start = 0;
            for c in regex!(r"\\c\s+(\d+)").captures_iter(&text[..whole.start()]) {
                if let Some(number) = c
                    .get(1)
                    .and_then(|g| {
                        g.as_str()
                            .parse()
                            .ok()
                    })
                {
                    chapter = number;
                    chapter_start = c
                        .get(0)
                        .map(|g| g.start())
                        .unwrap_or(0);
                }
            }

            self.diagnostics
                .push(Diagnostic {
                    reference: VerseRef {
                        book: self
                            .book
                            .clone(),
                        chapter,
                        verse: 0,
                    },
                    verse_end: None,
                    offset: whole.start() - chapter_start,
                    subject: Subject::Text(
                        whole
                            .as_str()
                            .to_owned(),
                    ),
                    message: (self.translate)(messages::MISSING_SPACES),
                    severity: Severity::Error,
                });
        }
    }

    /// Attribute checks shared by character styles and milestones.
    fn check_attributes(&mut self, marker: &str, style: &MarkerStyle, attributes: &[Attribute]) {
        let tagged = format!("\\{}", marker);

        for attr in attributes {
            if !style.has_attribute(&attr.name)
                && !attr
                    .name
                    .starts_with("x-")
                && !LINK_ATTRIBUTES.contains(
                    &attr
                        .name
                        .as_str(),
                )
            {
                self.error(
                    Subject::Marker(tagged.clone()),
                    messages::UNKNOWN_ATTRIBUTE,
                    Some(&attr.name),
                );
            }
        }

        for spec in &style.attributes {
            if spec.required
                && !attributes
                    .iter()
                    .any(|a| a.name == spec.name)
            {
                self.error(
                    Subject::Marker(tagged.clone()),
                    messages::MISSING_ATTRIBUTE,
                    Some(&spec.name),
                );
            }
        }

        // USFM 2 has no attribute syntax beyond the wordlist default
        // and the figure fields
        if self.version == UsfmVersion::Two && style.style_type == StyleType::Character {
            if marker == "fig" {
                for attr in attributes {
                    if !FIGURE_ATTRIBUTES.contains(
                        &attr
                            .name
                            .as_str(),
                    ) {
                        self.error(
                            Subject::Marker(tagged.clone()),
                            messages::UNSUPPORTED_ATTRIBUTE_USFM2,
                            Some(&attr.name),
                        );
                    }
                }
            } else {
                for attr in attributes {
                    if style
                        .default_attribute
                        .as_deref()
                        != Some(
                            attr.name
                                .as_str(),
                        )
                    {
                        self.error(
                            Subject::Marker(tagged.clone()),
                            messages::UNSUPPORTED_ATTRIBUTE_USFM2,
                            Some(&attr.name),
                        );
                    }
                }
            }
        }
    }

    /// Occurs-under placement for character styles and notes. NEST is
    /// a pseudo-context naming the nested character position; a
    /// descriptor constrained only by NEST places anywhere.
    fn check_context(&mut self, marker: &str, style: &MarkerStyle, state: &ParserState) {
        if style
            .occurs_under
            .is_empty()
        {
            return;
        }

        let contexts: Vec<&str> = style
            .occurs_under
            .iter()
            .map(String::as_str)
            .filter(|m| *m != "NEST")
            .collect();

        // The element on top is the one being opened; its parent is
        // the context to judge
        let below = &state.stack[..state
            .stack
            .len()
            .saturating_sub(1)];
        let parent_is_char = below
            .last()
            .map(|e| e.kind == ElementKind::Char)
            .unwrap_or(false);
        if parent_is_char
            && style
                .occurs_under
                .iter()
                .any(|m| m == "NEST")
        {
            return;
        }
        if contexts.is_empty() {
            return;
        }

        let context = below
            .iter()
            .rev()
            .find(|e| {
                matches!(
                    e.kind,
                    ElementKind::Char | ElementKind::Note | ElementKind::Para
                )
            })
            .and_then(|e| {
                e.marker
                    .as_deref()
            });
        let placed = context
            .map(|c| contexts.contains(&c))
            .unwrap_or(false);
        if !placed {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::INVALID_CONTEXT,
                Some(&tagged),
            );
        }
    }

    fn check_ruby(&mut self, span: &Span, attributes: &[Attribute]) {
        let gloss = attributes
            .iter()
            .chain(
                span.attributes
                    .iter(),
            )
            .find(|a| a.name == "gloss")
            .map(|a| {
                a.value
                    .clone()
            });
        let gloss = match gloss {
            Some(gloss) => gloss,
            None => return,
        };

        let base = span
            .text
            .trim();
        let bases = segment(base).len();
        let glosses = gloss
            .split(':')
            .count();

        if glosses < bases {
            self.error(
                Subject::Text(base.to_owned()),
                messages::FEWER_GLOSSES,
                None,
            );
        } else if glosses > bases {
            self.error(
                Subject::Text(base.to_owned()),
                messages::MORE_GLOSSES,
                None,
            );
        }
    }
}

impl<'s> ParserSink for MarkerCheck<'s> {
    fn got_marker(&mut self, state: &ParserState, marker: &str) {
        self.sync(state);

        let style = self.style_for(marker);
        if style.style_type == StyleType::Unknown {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::UNKNOWN_MARKER,
                Some(&tagged),
            );
        }

        if self.version == UsfmVersion::Two && marker.trim_start_matches('+') == "rb" {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::UNSUPPORTED_MARKER_USFM2,
                Some(&tagged),
            );
        }
    }

    fn start_book(&mut self, state: &ParserState, _marker: &str, code: &str) {
        self.sync(state);
        debug!(code, "book");
        self.para_stack
            .clear();
        let style = self.style_for("id");
        self.para_stack
            .push(&style);
        self.orphan_verse = None;
    }

    fn chapter(
        &mut self,
        state: &ParserState,
        _number: &str,
        marker: &str,
        _alt_number: Option<&str>,
        _pub_number: Option<&str>,
    ) {
        self.sync(state);
        let style = self.style_for(marker);
        self.para_stack
            .push(&style);
        self.orphan_verse = None;
        self.last_closed_char = None;
    }

    fn verse(
        &mut self,
        state: &ParserState,
        _number: &str,
        marker: &str,
        _alt_number: Option<&str>,
        _pub_number: Option<&str>,
    ) {
        self.sync(state);
        self.last_closed_char = None;
        self.para_content = true;

        if state
            .para_marker()
            .is_none()
        {
            // Fold runs of verses with no enclosing paragraph
            match self.orphan_verse {
                Some(i)
                    if self.diagnostics[i]
                        .reference
                        .chapter
                        == self.chapter =>
                {
                    self.diagnostics[i].verse_end = Some(self.verse);
                }
                _ => {
                    let tagged = format!("\\{}", marker);
                    self.error(Subject::Marker(tagged), messages::VERSE_WITHOUT_PARA, None);
                    self.orphan_verse = Some(
                        self.diagnostics
                            .len()
                            - 1,
                    );
                }
            }
        } else {
            self.orphan_verse = None;
        }
    }

    fn start_para(&mut self, state: &ParserState, marker: &str) {
        self.sync(state);
        self.orphan_verse = None;
        self.para_content = false;
        self.last_closed_char = None;

        let style = self.style_for(marker);
        if !self
            .para_stack
            .push(&style)
        {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::INVALID_CONTEXT,
                Some(&tagged),
            );
        }
    }

    fn end_para(&mut self, state: &ParserState, marker: &str) {
        self.sync(state);
        if !self.para_content && !EMPTY_ALLOWED.contains(&marker) {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::EMPTY_MARKER,
                Some(&tagged),
            );
        }
        self.para_content = true;
    }

    fn start_char(
        &mut self,
        state: &ParserState,
        marker: &str,
        closed: bool,
        attributes: &[Attribute],
    ) {
        self.sync(state);
        let style = self.style_for(marker);
        let tagged = format!("\\{}", marker);

        let repeated = self
            .last_closed_char
            .as_deref()
            == Some(marker)
            && REPEAT_SUSPECTS.contains(&marker);
        if repeated {
            self.warning(
                Subject::Marker(tagged.clone()),
                messages::REPEATED_MARKER,
                Some(&tagged),
            );
        }
        self.last_closed_char = None;

        if state
            .para_marker()
            .is_none()
        {
            self.error(
                Subject::Marker(tagged.clone()),
                messages::CHAR_WITHOUT_PARA,
                Some(&tagged),
            );
        }

        // Styles that nest (or figures) must close explicitly
        let demands_close = marker.trim_start_matches('+') == "fig"
            || style
                .occurs_under
                .iter()
                .any(|m| m == "NEST");
        if demands_close && !closed {
            self.error(
                Subject::Marker(tagged.clone()),
                messages::CHAR_NOT_CLOSED,
                Some(&tagged),
            );
        }

        self.check_context(marker, &style, state);
        self.check_attributes(marker, &style, attributes);

        self.para_content = true;
        self.spans
            .push(Span {
                marker: marker.to_owned(),
                has_text: false,
                text: String::new(),
                attributes: attributes.to_vec(),
            });
    }

    fn end_char(&mut self, state: &ParserState, _marker: &str, attributes: &[Attribute]) {
        self.sync(state);
        let span = match self
            .spans
            .pop()
        {
            Some(span) => span,
            None => return,
        };

        if !span.has_text
            && !EMPTY_ALLOWED.contains(
                &span
                    .marker
                    .as_str(),
            )
        {
            let tagged = format!("\\{}", span.marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::EMPTY_MARKER,
                Some(&tagged),
            );
        }

        if span
            .marker
            .trim_start_matches('+')
            == "rb"
        {
            self.check_ruby(&span, attributes);
        }

        self.last_closed_char = Some(
            span.marker
                .clone(),
        );
    }

    fn start_note(
        &mut self,
        state: &ParserState,
        marker: &str,
        caller: &str,
        _category: Option<&str>,
        closed: bool,
    ) {
        self.sync(state);
        let style = self.style_for(marker);
        let tagged = format!("\\{}", marker);
        self.last_closed_char = None;
        self.para_content = true;

        if state
            .para_marker()
            .is_none()
        {
            self.error(
                Subject::Marker(tagged.clone()),
                messages::NOTE_WITHOUT_PARA,
                Some(&tagged),
            );
        }

        if !closed {
            self.error(
                Subject::Marker(tagged.clone()),
                messages::NOTE_NOT_CLOSED,
                Some(&tagged),
            );
        }

        if caller
            .trim()
            .is_empty()
        {
            self.error(
                Subject::Marker(tagged.clone()),
                messages::MISSING_CALLER,
                Some(&tagged),
            );
        }

        self.check_context(marker, &style, state);

        self.spans
            .push(Span {
                marker: marker.to_owned(),
                has_text: false,
                text: String::new(),
                attributes: vec![],
            });
    }

    fn end_note(&mut self, state: &ParserState, _marker: &str) {
        self.sync(state);
        if let Some(span) = self
            .spans
            .pop()
        {
            if !span.has_text {
                let tagged = format!("\\{}", span.marker);
                self.error(
                    Subject::Marker(tagged.clone()),
                    messages::EMPTY_MARKER,
                    Some(&tagged),
                );
            }
        }
        self.last_closed_char = None;
    }

    fn start_row(&mut self, state: &ParserState, _marker: &str) {
        self.sync(state);
        self.expected_cell = 1;
    }

    fn start_cell(&mut self, state: &ParserState, marker: &str, _align: CellAlign) {
        self.sync(state);
        self.para_content = true;

        // Cell markers are numbered th1, tc2, thr3...; each row counts
        // from 1 without gaps
        let digits: String = marker
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .collect();
        if let Ok(number) = digits.parse::<u32>() {
            if number != self.expected_cell {
                let tagged = format!("\\{}", marker);
                self.error(
                    Subject::Marker(tagged.clone()),
                    messages::MISSING_CELL,
                    Some(&tagged),
                );
            }
            self.expected_cell = number + 1;
        }
    }

    fn text(&mut self, state: &ParserState, text: &str) {
        self.sync(state);

        if !text
            .trim()
            .is_empty()
        {
            self.para_content = true;
            self.last_closed_char = None;
            for span in &mut self.spans {
                span.has_text = true;
            }
        }
        for span in &mut self.spans {
            span.text
                .push_str(text);
        }

        // A | surviving into the text of a closed character style is
        // an attribute specification that failed to parse
        if text.contains('|') {
            if let Some(top) = state
                .stack
                .last()
            {
                if top.kind == ElementKind::Char && top.closed {
                    self.error(
                        Subject::Text(text.to_owned()),
                        messages::INVALID_ATTRIBUTE,
                        None,
                    );
                }
            }
        }
    }

    fn unmatched(&mut self, state: &ParserState, marker: &str) {
        self.sync(state);
        let tagged = format!("\\{}", marker);
        self.error(
            Subject::Marker(tagged.clone()),
            messages::UNMATCHED_END,
            Some(&tagged),
        );
    }

    fn start_sidebar(
        &mut self,
        state: &ParserState,
        marker: &str,
        _category: Option<&str>,
        closed: bool,
    ) {
        self.sync(state);
        if !closed {
            let tagged = format!("\\{}", marker);
            self.error(
                Subject::Marker(tagged.clone()),
                messages::SIDEBAR_NOT_CLOSED,
                Some(&tagged),
            );
        }
        let style = self.style_for(marker);
        self.para_stack
            .push(&style);
    }

    fn milestone(
        &mut self,
        state: &ParserState,
        marker: &str,
        start: bool,
        attributes: &[Attribute],
    ) {
        self.sync(state);
        let style = self.style_for(marker);
        let tagged = format!("\\{}", marker);

        if self.version == UsfmVersion::Two {
            self.error(
                Subject::Marker(tagged.clone()),
                messages::UNSUPPORTED_MARKER_USFM2,
                Some(&tagged),
            );
        }

        self.check_attributes(marker, &style, attributes);

        let id = attributes
            .iter()
            .find(|a| a.name == "id")
            .map(|a| {
                a.value
                    .clone()
            });

        if start {
            let end = style
                .end_marker
                .clone()
                .unwrap_or_default();
            self.milestones
                .push(OpenMilestone {
                    marker: marker.to_owned(),
                    end,
                    id,
                });
        } else {
            match self
                .milestones
                .iter()
                .rposition(|m| m.end == marker)
            {
                Some(i) => {
                    let open = self
                        .milestones
                        .remove(i);
                    if open.id != id {
                        self.error(
                            Subject::Marker(tagged.clone()),
                            messages::MILESTONE_ID_MISMATCH,
                            None,
                        );
                    }
                }
                None => {
                    self.error(
                        Subject::Marker(tagged.clone()),
                        messages::MILESTONE_END_WITHOUT_START,
                        Some(&tagged),
                    );
                }
            }
        }
    }
}

/// Whether any diagnostic is an error (warnings alone stay exit 0).
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| d.severity == Severity::Error)
}

/// Check one book: tokenize, pre-scan the raw text, parse against the
/// validating sink, and collect the diagnostics.
pub fn check_book(
    catalog: &mut MarkerCatalog,
    book: &str,
    version: UsfmVersion,
    text: &str,
) -> Vec<Diagnostic> {
    check_book_with(catalog, book, version, identity, text)
}

pub fn check_book_with(
    catalog: &mut MarkerCatalog,
    book: &str,
    version: UsfmVersion,
    translate: Translator,
    text: &str,
) -> Vec<Diagnostic> {
    let tokens = tokenize(catalog, text, false);
    debug!(tokens = tokens.len(), "tokenized");

    let mut check = MarkerCheck::new(catalog, book, version).with_translator(translate);
    check.check_marker_spacing(text);
    check.check_first_marker(&tokens);

    let mut parser = UsfmParser::new(&tokens, false);
    parser.process_all(&mut check);
    parser.close_all(&mut check);

    check.finish()
}
