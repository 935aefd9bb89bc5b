// Segmentation of ruby base text into the units glosses align with.

use unicode_normalization::char::is_combining_mark;

/// Split text into grapheme-like units: combining marks attach to the
/// preceding base character, except after a literal space; spaces are
/// emitted one by one. A supplementary-plane character counts as the
/// two units of its surrogate pair.
pub fn segment(text: &str) -> Vec<String> {
    let mut units: Vec<String> = vec![];

    for c in text.chars() {
        if c == ' ' {
            units.push(c.to_string());
            continue;
        }
        if is_combining_mark(c) {
            if let Some(last) = units.last_mut() {
                if last != " " {
                    last.push(c);
                    continue;
                }
            }
        }
        units.push(c.to_string());
        if c.len_utf16() == 2 {
            units.push(String::new());
        }
    }

    units
}
