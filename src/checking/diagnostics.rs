use crate::language::VerseRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// What a diagnostic points at: a marker or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Marker(String),
    Text(String),
}

/// One rule violation. The offset is a byte offset within the current
/// verse; `verse_end` folds a run of consecutive offenders into a
/// `v-v` range.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub reference: VerseRef,
    pub verse_end: Option<u32>,
    pub offset: usize,
    pub subject: Subject,
    pub message: String,
    pub severity: Severity,
}
