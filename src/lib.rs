// The markercheck library: stylesheet catalog, USFM tokenizer, the
// pushdown parser that drives a validating sink, and the checks
// themselves. The binary in main.rs is a thin front-end over these.

#[macro_use]
mod regex;

pub mod checking;
pub mod language;
pub mod parsing;
pub mod stylesheet;
