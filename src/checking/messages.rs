// Message keys for diagnostics. The keys double as the English
// messages; a translator maps them to other languages.

pub const MISSING_ID: &str = "missing \\id marker";
pub const MISSING_SPACES: &str = "Missing spaces before markers";
pub const UNKNOWN_MARKER: &str = "Unknown marker";
pub const EMPTY_MARKER: &str = "Empty marker";
pub const REPEATED_MARKER: &str = "Repeated character marker";
pub const CHAR_NOT_CLOSED: &str = "Character style not closed";
pub const CHAR_WITHOUT_PARA: &str = "Character marker without a paragraph marker";
pub const VERSE_WITHOUT_PARA: &str = "Verse marker without a paragraph marker";
pub const NOTE_WITHOUT_PARA: &str = "Note marker without a paragraph marker";
pub const NOTE_NOT_CLOSED: &str = "Note not closed";
pub const SIDEBAR_NOT_CLOSED: &str = "Sidebar not closed";
pub const UNMATCHED_END: &str = "Unmatched end marker";
pub const MISSING_CELL: &str = "Missing table cell marker";
pub const MISSING_ATTRIBUTE: &str = "Missing required attribute";
pub const UNKNOWN_ATTRIBUTE: &str = "Unknown attribute";
pub const INVALID_ATTRIBUTE: &str = "Invalid attribute";
pub const INVALID_CONTEXT: &str = "Marker is not valid in this context";
pub const MISSING_MILESTONE_END: &str = "Missing milestone end";
pub const MILESTONE_END_WITHOUT_START: &str = "Milestone end without matching start";
pub const MILESTONE_ID_MISMATCH: &str = "Id on start/end milestones do not match";
pub const UNSUPPORTED_MARKER_USFM2: &str = "Marker not supported for USFM 2.0 projects";
pub const UNSUPPORTED_ATTRIBUTE_USFM2: &str = "Attribute not supported for USFM 2.0 projects";
pub const FEWER_GLOSSES: &str = "Fewer ruby glosses than base text characters";
pub const MORE_GLOSSES: &str = "More ruby glosses than base text characters";
pub const MISSING_CALLER: &str = "Missing caller in note";
