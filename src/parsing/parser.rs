// Pushdown parser over the token stream. Maintains the open-element
// stack and the current verse reference, and reports structure to a
// sink; it never fails on malformed input.

use crate::language::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Book,
    Para,
    Char,
    Table,
    Row,
    Cell,
    Note,
    Sidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAlign {
    Start,
    Center,
    End,
}

/// One open construct on the parser stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub marker: Option<String>,
    pub attributes: Vec<Attribute>,
    pub closed: bool,
}

impl Element {
    fn new(kind: ElementKind, marker: Option<&str>) -> Element {
        Element {
            kind,
            marker: marker.map(str::to_owned),
            attributes: vec![],
            closed: false,
        }
    }
}

/// The parser state a sink is allowed to look at.
#[derive(Debug, Clone)]
pub struct ParserState {
    pub stack: Vec<Element>,
    pub verse: VerseRef,
    pub verse_offset: usize,
    pub special_token: bool,
}

impl ParserState {
    /// Marker of the paragraph currently open, if any.
    pub fn para_marker(&self) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .find(|e| e.kind == ElementKind::Para)
            .and_then(|e| {
                e.marker
                    .as_deref()
            })
    }

    pub fn in_note(&self) -> bool {
        self.stack
            .iter()
            .any(|e| e.kind == ElementKind::Note)
    }

    /// Marker of the construct an incoming marker would nest under:
    /// the innermost open character style, note, or paragraph.
    pub fn context_marker(&self) -> Option<&str> {
        self.stack
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
            })
    }
}

/// Structure callbacks. Every method has an empty default so a sink
/// implements only what it cares about.
#[allow(unused_variables)]
pub trait ParserSink {
    fn got_marker(&mut self, state: &ParserState, marker: &str) {}
    fn start_book(&mut self, state: &ParserState, marker: &str, code: &str) {}
    fn end_book(&mut self, state: &ParserState, marker: &str) {}
    fn chapter(
        &mut self,
        state: &ParserState,
        number: &str,
        marker: &str,
        alt_number: Option<&str>,
        pub_number: Option<&str>,
    ) {
    }
    fn verse(
        &mut self,
        state: &ParserState,
        number: &str,
        marker: &str,
        alt_number: Option<&str>,
        pub_number: Option<&str>,
    ) {
    }
    fn start_para(&mut self, state: &ParserState, marker: &str) {}
    fn end_para(&mut self, state: &ParserState, marker: &str) {}
    fn start_char(
        &mut self,
        state: &ParserState,
        marker: &str,
        closed: bool,
        attributes: &[Attribute],
    ) {
    }
    fn end_char(&mut self, state: &ParserState, marker: &str, attributes: &[Attribute]) {}
    fn start_note(
        &mut self,
        state: &ParserState,
        marker: &str,
        caller: &str,
        category: Option<&str>,
        closed: bool,
    ) {
    }
    fn end_note(&mut self, state: &ParserState, marker: &str) {}
    fn start_table(&mut self, state: &ParserState) {}
    fn end_table(&mut self, state: &ParserState) {}
    fn start_row(&mut self, state: &ParserState, marker: &str) {}
    fn end_row(&mut self, state: &ParserState, marker: &str) {}
    fn start_cell(&mut self, state: &ParserState, marker: &str, align: CellAlign) {}
    fn end_cell(&mut self, state: &ParserState, marker: &str) {}
    fn text(&mut self, state: &ParserState, text: &str) {}
    fn unmatched(&mut self, state: &ParserState, marker: &str) {}
    fn reference(&mut self, state: &ParserState, marker: &str, display: &str, target: &str) {}
    fn start_sidebar(
        &mut self,
        state: &ParserState,
        marker: &str,
        category: Option<&str>,
        closed: bool,
    ) {
    }
    fn end_sidebar(&mut self, state: &ParserState, marker: &str) {}
    fn opt_break(&mut self, state: &ParserState) {}
    fn milestone(
        &mut self,
        state: &ParserState,
        marker: &str,
        start: bool,
        attributes: &[Attribute],
    ) {
    }
}

/// Sink that ignores everything; used by lookahead probes.
pub struct NoopSink;

impl ParserSink for NoopSink {}

pub struct UsfmParser<'s> {
    tokens: &'s [Token],
    index: usize,
    skip: usize,
    preserve_whitespace: bool,
    // whether the element most recently popped was closed by its own
    // end marker; lookahead probes read this
    last_close_matched: bool,
    probing: bool,
    pub state: ParserState,
}

impl<'s> UsfmParser<'s> {
    pub fn new(tokens: &'s [Token], preserve_whitespace: bool) -> UsfmParser<'s> {
        UsfmParser {
            tokens,
            index: 0,
            skip: 0,
            preserve_whitespace,
            last_close_matched: false,
            probing: false,
            state: ParserState {
                stack: vec![],
                verse: VerseRef {
                    book: String::new(),
                    chapter: 1,
                    verse: 0,
                },
                verse_offset: 0,
                special_token: false,
            },
        }
    }

    /// Fork the parser for a lookahead. The probe advances over the
    /// same token slice without the primary observing any change.
    fn probe(&self) -> UsfmParser<'s> {
        UsfmParser {
            tokens: self.tokens,
            index: self.index,
            skip: self.skip,
            preserve_whitespace: self.preserve_whitespace,
            last_close_matched: false,
            probing: true,
            state: self
                .state
                .clone(),
        }
    }

    pub fn process_all<S: ParserSink>(&mut self, sink: &mut S) {
        while self.process_token(sink) {}
    }

    /// Advance one token. Returns false once the stream is exhausted.
    pub fn process_token<S: ParserSink>(&mut self, sink: &mut S) -> bool {
        if self.index
            >= self
                .tokens
                .len()
        {
            return false;
        }

        // The previous token's displayed length moves the offset
        // within the current verse forward
        let tokens = self.tokens;
        if self.index > 0 {
            self.state
                .verse_offset += tokens[self.index - 1].length(!self.preserve_whitespace);
        }

        let token = &tokens[self.index];
        self.index += 1;

        // Tokens claimed by an earlier lookahead are not reprocessed
        if self.skip > 0 {
            self.skip -= 1;
            self.state
                .special_token = true;
            return true;
        }
        self.state
            .special_token = false;
        self.last_close_matched = false;

        // Inside a note an unknown marker reads as a character style;
        // elsewhere it reads as a paragraph
        let kind = match token.kind {
            TokenKind::Unknown => {
                if self
                    .state
                    .in_note()
                {
                    TokenKind::Character
                } else {
                    TokenKind::Paragraph
                }
            }
            kind => kind,
        };

        if let Some(marker) = token
            .marker
            .as_deref()
        {
            sink.got_marker(&self.state, marker);
        }

        // Closing rules fire before opening rules
        match kind {
            TokenKind::Book | TokenKind::Chapter => self.close_all(sink),
            TokenKind::Paragraph => {
                match token
                    .marker
                    .as_deref()
                {
                    Some("tr") => {
                        self.close_down_to(sink, &[ElementKind::Table, ElementKind::Sidebar])
                    }
                    Some("esb") => self.close_all(sink),
                    _ => self.close_down_to(sink, &[ElementKind::Sidebar]),
                }
            }
            TokenKind::Character => {
                let marker = token
                    .marker
                    .as_deref()
                    .unwrap_or_default();
                if self.is_cell(token) {
                    self.close_down_to(sink, &[ElementKind::Row]);
                } else if token.nestless_marker() == Some("ref") {
                    // refs close nothing
                } else if !marker.starts_with('+') {
                    while self
                        .state
                        .stack
                        .last()
                        .map(|e| e.kind == ElementKind::Char)
                        .unwrap_or(false)
                    {
                        self.close_element(sink);
                    }
                }
            }
            TokenKind::Verse | TokenKind::Note => self.close_note(sink),
            TokenKind::End => {
                self.process_end(token, sink);
                return true;
            }
            _ => {}
        }

        // Opening rules
        match kind {
            TokenKind::Book => {
                let marker = token
                    .marker
                    .as_deref()
                    .unwrap_or_default();
                let code = token
                    .data
                    .first()
                    .cloned()
                    .unwrap_or_default();
                self.state
                    .stack
                    .push(Element::new(ElementKind::Book, Some(marker)));
                if self
                    .state
                    .verse
                    .book
                    .is_empty()
                    && book_id_to_number(&code) > 0
                {
                    self.state
                        .verse
                        .book = code.clone();
                }
                self.state
                    .verse
                    .chapter = 1;
                self.state
                    .verse
                    .verse = 0;
                sink.start_book(&self.state, marker, &code);
            }
            TokenKind::Chapter => self.open_chapter(token, sink),
            TokenKind::Verse => self.open_verse(token, sink),
            TokenKind::Paragraph => self.open_paragraph(token, sink),
            TokenKind::Character => self.open_character(token, sink),
            TokenKind::Note => self.open_note(token, sink),
            TokenKind::Text => self.emit_text(token, sink),
            TokenKind::Milestone | TokenKind::MilestoneEnd => {
                let marker = token
                    .marker
                    .as_deref()
                    .unwrap_or_default();
                sink.milestone(
                    &self.state,
                    marker,
                    kind == TokenKind::Milestone,
                    &token.attributes,
                );
            }
            TokenKind::End | TokenKind::Unknown => {}
        }

        true
    }

    /// Pop until an element of one of the given kinds is on top (or
    /// the stack empties), firing end callbacks.
    fn close_down_to<S: ParserSink>(&mut self, sink: &mut S, kinds: &[ElementKind]) {
        loop {
            let kind = match self
                .state
                .stack
                .last()
            {
                Some(top) => top.kind,
                None => break,
            };
            if kinds.contains(&kind) {
                break;
            }
            self.close_element(sink);
        }
    }

    /// Pop the entire stack, firing end callbacks.
    pub fn close_all<S: ParserSink>(&mut self, sink: &mut S) {
        while !self
            .state
            .stack
            .is_empty()
        {
            self.close_element(sink);
        }
    }

    fn close_element<S: ParserSink>(&mut self, sink: &mut S) {
        let elem = match self
            .state
            .stack
            .pop()
        {
            Some(elem) => elem,
            None => return,
        };
        let marker = elem
            .marker
            .as_deref()
            .unwrap_or_default();
        match elem.kind {
            ElementKind::Book => sink.end_book(&self.state, marker),
            ElementKind::Para => sink.end_para(&self.state, marker),
            ElementKind::Char => sink.end_char(&self.state, marker, &elem.attributes),
            ElementKind::Table => sink.end_table(&self.state),
            ElementKind::Row => sink.end_row(&self.state, marker),
            ElementKind::Cell => sink.end_cell(&self.state, marker),
            ElementKind::Note => sink.end_note(&self.state, marker),
            ElementKind::Sidebar => sink.end_sidebar(&self.state, marker),
        }
    }

    fn close_note<S: ParserSink>(&mut self, sink: &mut S) {
        if !self
            .state
            .in_note()
        {
            return;
        }
        loop {
            let is_note = match self
                .state
                .stack
                .last()
            {
                Some(top) => top.kind == ElementKind::Note,
                None => break,
            };
            self.close_element(sink);
            if is_note {
                break;
            }
        }
    }

    fn process_end<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let marker = token
            .marker
            .as_deref()
            .unwrap_or_default();

        // A matching open note wins
        let matches_note = self
            .state
            .stack
            .iter()
            .any(|e| {
                e.kind == ElementKind::Note
                    && e.marker
                        .as_deref()
                        .map(|m| format!("{}*", m))
                        .as_deref()
                        == Some(marker)
            });
        if matches_note {
            self.close_note(sink);
            self.last_close_matched = true;
            return;
        }

        // Otherwise pop character styles until one matches, with a +
        // prefix expected where the style was nested
        let mut unmatched = true;
        while self
            .state
            .stack
            .last()
            .map(|e| e.kind == ElementKind::Char)
            .unwrap_or(false)
        {
            let nested = self
                .state
                .stack
                .len()
                >= 2
                && self.state.stack[self
                    .state
                    .stack
                    .len()
                    - 2]
                .kind
                    == ElementKind::Char;
            let elem_marker = self
                .state
                .stack
                .last()
                .and_then(|e| {
                    e.marker
                        .clone()
                })
                .unwrap_or_default();
            self.close_element(sink);

            let expected = if nested {
                format!("+{}*", elem_marker)
            } else {
                format!("{}*", elem_marker)
            };
            if expected == marker {
                unmatched = false;
                break;
            }
        }

        if unmatched {
            sink.unmatched(&self.state, marker);
        } else {
            self.last_close_matched = true;
        }
    }

    fn open_chapter<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let marker = token
            .marker
            .as_deref()
            .unwrap_or_default();
        let number = token
            .data
            .first()
            .cloned()
            .unwrap_or_default();

        // \ca n\ca* carries an alternate chapter number
        let mut ahead = self.index;
        let alt_number = self.take_trio(ahead, "ca");
        if alt_number.is_some() {
            self.skip += 3;
            ahead += 3;
        }

        // \cp n carries the published chapter number
        let mut pub_number = None;
        if let (Some(a), Some(b)) = (
            self.tokens
                .get(ahead),
            self.tokens
                .get(ahead + 1),
        ) {
            if a.marker
                .as_deref()
                == Some("cp")
                && b.kind == TokenKind::Text
            {
                pub_number = b
                    .text
                    .as_deref()
                    .map(|t| {
                        t.trim()
                            .to_owned()
                    });
                self.skip += 2;
            }
        }

        if let Ok(n) = number.parse::<u32>() {
            self.state
                .verse
                .chapter = n;
        }
        self.state
            .verse
            .verse = 0;
        // Chapter 1 keeps accumulating from the book introduction
        if self
            .state
            .verse
            .chapter
            != 1
        {
            self.state
                .verse_offset = 0;
        }

        sink.chapter(
            &self.state,
            &number,
            marker,
            alt_number.as_deref(),
            pub_number.as_deref(),
        );
    }

    fn open_verse<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let marker = token
            .marker
            .as_deref()
            .unwrap_or_default();
        let number = token
            .data
            .first()
            .cloned()
            .unwrap_or_default();

        let mut ahead = self.index;
        let alt_number = self.take_trio(ahead, "va");
        if alt_number.is_some() {
            self.skip += 3;
            ahead += 3;
        }
        let pub_number = self.take_trio(ahead, "vp");
        if pub_number.is_some() {
            self.skip += 3;
        }

        let digits: String = number
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(n) = digits.parse::<u32>() {
            self.state
                .verse
                .verse = n;
        }
        self.state
            .verse_offset = 0;

        sink.verse(
            &self.state,
            &number,
            marker,
            alt_number.as_deref(),
            pub_number.as_deref(),
        );
    }

    /// Match a `\xx value\xx*` trio starting at the given token
    /// position, returning the enclosed value.
    fn take_trio(&self, at: usize, marker: &str) -> Option<String> {
        let a = self
            .tokens
            .get(at)?;
        let b = self
            .tokens
            .get(at + 1)?;
        let c = self
            .tokens
            .get(at + 2)?;
        let end = format!("{}*", marker);
        if a.marker
            .as_deref()
            == Some(marker)
            && b.kind == TokenKind::Text
            && c.marker
                .as_deref()
                == Some(end.as_str())
        {
            b.text
                .as_deref()
                .map(|t| {
                    t.trim()
                        .to_owned()
                })
        } else {
            None
        }
    }

    fn open_paragraph<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let marker = token
            .marker
            .as_deref()
            .unwrap_or_default();
        match marker {
            "tr" => {
                if !self
                    .state
                    .stack
                    .iter()
                    .any(|e| e.kind == ElementKind::Table)
                {
                    self.state
                        .stack
                        .push(Element::new(ElementKind::Table, None));
                    sink.start_table(&self.state);
                }
                self.state
                    .stack
                    .push(Element::new(ElementKind::Row, Some(marker)));
                sink.start_row(&self.state, marker);
            }
            "esb" => {
                let closed = self.is_sidebar_closed();
                let category = self.take_trio(self.index, "cat");
                if category.is_some() {
                    self.skip += 3;
                }
                // The sidebar is pushed whether or not an \esbe was
                // found; its closed-ness is still reported.
                let mut elem = Element::new(ElementKind::Sidebar, Some(marker));
                elem.closed = closed;
                self.state
                    .stack
                    .push(elem);
                sink.start_sidebar(&self.state, marker, category.as_deref(), closed);
            }
            "esbe" => {
                if self
                    .state
                    .stack
                    .iter()
                    .any(|e| e.kind == ElementKind::Sidebar)
                {
                    self.close_all(sink);
                } else {
                    sink.unmatched(&self.state, marker);
                }
            }
            _ => {
                self.state
                    .stack
                    .push(Element::new(ElementKind::Para, Some(marker)));
                sink.start_para(&self.state, marker);
            }
        }
    }

    fn is_sidebar_closed(&self) -> bool {
        for token in &self.tokens[self.index..] {
            match token.kind {
                TokenKind::Book | TokenKind::Chapter => return false,
                TokenKind::Paragraph => {
                    match token
                        .marker
                        .as_deref()
                    {
                        Some("esbe") => return true,
                        Some("esb") => return false,
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn is_cell(&self, token: &Token) -> bool {
        let marker = token
            .nestless_marker()
            .unwrap_or_default();
        (marker.starts_with("th") || marker.starts_with("tc"))
            && self
                .state
                .stack
                .iter()
                .any(|e| e.kind == ElementKind::Row)
    }

    fn open_character<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let marker = token
            .marker
            .as_deref()
            .unwrap_or_default();

        if self.is_cell(token) {
            // alignment is encoded in the marker's third character
            let align = match marker
                .chars()
                .nth(2)
            {
                Some('c') => CellAlign::Center,
                Some('r') => CellAlign::End,
                _ => CellAlign::Start,
            };
            self.state
                .stack
                .push(Element::new(ElementKind::Cell, Some(marker)));
            sink.start_cell(&self.state, marker, align);
            return;
        }

        if token.nestless_marker() == Some("ref") {
            // A ref does not stand alone: its text and end marker are
            // folded into a single callback
            self.state
                .special_token = true;
            let mut display = String::new();
            let mut target = String::new();
            if let (Some(a), Some(b)) = (
                self.tokens
                    .get(self.index),
                self.tokens
                    .get(self.index + 1),
            ) {
                if a.kind == TokenKind::Text
                    && b.marker
                        .as_deref()
                        == Some("ref*")
                {
                    let text = a
                        .text
                        .as_deref()
                        .unwrap_or_default();
                    match text.split_once('|') {
                        Some((before, after)) => {
                            display = before.to_owned();
                            target = after.to_owned();
                        }
                        None => {
                            display = text.to_owned();
                            target = text.to_owned();
                        }
                    }
                    self.skip += 2;
                }
            }
            sink.reference(&self.state, marker, &display, &target);
            return;
        }

        // The + prefix is dropped only when this is actually nested in
        // an open character style
        let top_is_char = self
            .state
            .stack
            .last()
            .map(|e| e.kind == ElementKind::Char)
            .unwrap_or(false);
        let actual = if let Some(stripped) = marker.strip_prefix('+') {
            if top_is_char {
                stripped
            } else {
                marker
            }
        } else {
            marker
        };

        let mut elem = Element::new(ElementKind::Char, Some(actual));
        elem.attributes = token
            .attributes
            .clone();
        self.state
            .stack
            .push(elem);

        let closed = if self.probing {
            false
        } else {
            self.is_token_closed()
        };
        if let Some(top) = self
            .state
            .stack
            .last_mut()
        {
            top.closed = closed;
        }

        sink.start_char(&self.state, actual, closed, &token.attributes);
    }

    fn open_note<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let marker = token
            .marker
            .as_deref()
            .unwrap_or_default();
        let caller = token
            .data
            .first()
            .cloned()
            .unwrap_or_default();

        let category = self.take_trio(self.index, "cat");
        if category.is_some() {
            self.skip += 3;
        }

        self.state
            .stack
            .push(Element::new(ElementKind::Note, Some(marker)));

        let closed = if self.probing {
            false
        } else {
            self.is_token_closed()
        };
        if let Some(top) = self
            .state
            .stack
            .last_mut()
        {
            top.closed = closed;
        }

        sink.start_note(&self.state, marker, &caller, category.as_deref(), closed);
    }

    fn emit_text<S: ParserSink>(&mut self, token: &Token, sink: &mut S) {
        let mut text = token
            .text
            .clone()
            .unwrap_or_default();

        // Trailing space before structure (or the end of the stream)
        // is an artifact of the markup, not content
        let at_end = self.index
            >= self
                .tokens
                .len();
        let next_structural = self
            .tokens
            .get(self.index)
            .map(|t| {
                matches!(
                    t.kind,
                    TokenKind::Paragraph | TokenKind::Book | TokenKind::Chapter
                )
            })
            .unwrap_or(false);
        if (at_end || next_structural) && !self.preserve_whitespace && text.ends_with(' ') {
            text.pop();
        }

        let text = text.replace('~', "\u{00A0}");

        let mut first = true;
        for piece in text.split("//") {
            if !first {
                sink.opt_break(&self.state);
            }
            first = false;
            sink.text(&self.state, piece);
        }
    }

    /// Decide whether the character style or note just pushed will be
    /// closed by its own end marker, by running a silent probe forward
    /// over the remaining tokens.
    fn is_token_closed(&self) -> bool {
        let mut probe = self.probe();
        let depth = probe
            .state
            .stack
            .len();
        let mut sink = NoopSink;
        while probe.process_token(&mut sink) {
            if probe
                .state
                .stack
                .len()
                < depth
            {
                // Closed only if ours was the element the end marker
                // matched, not a casualty of an implicit close
                return probe
                    .state
                    .stack
                    .len()
                    == depth - 1
                    && probe.last_close_matched;
            }
        }
        false
    }
}
