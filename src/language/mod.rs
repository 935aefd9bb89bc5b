// Data model for USFM documents: marker descriptors from the
// stylesheet, tokens from the tokenizer, and Scripture references.

mod error;
mod reference;
mod styles;
mod tokens;

// Re-export all public symbols
pub use error::*;
pub use reference::*;
pub use styles::*;
pub use tokens::*;
