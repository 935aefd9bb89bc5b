use owo_colors::OwoColorize;
use std::path::Path;

use markercheck::checking::{Diagnostic, Subject};
use markercheck::language::LoadingError;
use markercheck::stylesheet::SheetError;

/// Render one check diagnostic in the reporting format:
///
///   MarkerCheck: GEN:3:15 Offset: 27 Marker: \bd Message: #...
///
/// Offsets are byte offsets within the current verse; a run of verses
/// folds into a v-v range.
pub fn diagnostic_line(diagnostic: &Diagnostic) -> String {
    let reference = match diagnostic.verse_end {
        Some(end) => format!(
            "{}:{}:{}-{}",
            diagnostic
                .reference
                .book,
            diagnostic
                .reference
                .chapter,
            diagnostic
                .reference
                .verse,
            end
        ),
        None => diagnostic
            .reference
            .to_string(),
    };

    let (label, value) = match &diagnostic.subject {
        Subject::Marker(value) => ("Marker", value),
        Subject::Text(value) => ("Text", value),
    };

    format!(
        "MarkerCheck: {} Offset: {} {}: {} Message: #{}",
        reference, diagnostic.offset, label, value, diagnostic.message
    )
}

/// Format a LoadingError with concise single-line output
pub fn concise_loading_error(error: &LoadingError) -> String {
    format!(
        "{}: {}: {}",
        "error".bright_red(),
        error
            .filename
            .display(),
        error
            .problem
            .bold()
    )
}

/// Format a stylesheet parse error with its line number
pub fn stylesheet_error(filename: &Path, error: &SheetError) -> String {
    format!(
        "{}: {}:{} {}",
        "error".bright_red(),
        filename.display(),
        error.line(),
        error.message()
    )
}
