// Program wide diagnostic presentation

mod format;

// Re-export all public symbols
pub use format::*;
