//! Location cleanup for the display.
//!
//! Outlook fills the location of online meetings with the platform name,
//! often next to a real room ("Microsoft Teams Meeting; Room 5"). The display
//! only has room for the physical part, so the platform phrases are removed
//! and the remaining whitespace collapsed.

use std::sync::LazyLock;

use regex::Regex;

/// Virtual-meeting phrases removed from locations, longest variants first so
/// that "Microsoft Teams Meeting" is not left as a stray "Meeting".
pub const VIRTUAL_MEETING_PHRASES: [&str; 4] = [
    "Microsoft Teams-Besprechung",
    "Microsoft Teams Meeting",
    "Microsoft Teams",
    "MS Teams",
];

static PHRASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = VIRTUAL_MEETING_PHRASES
        .iter()
        .map(|phrase| regex::escape(phrase))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).expect("Invalid virtual meeting regex")
});

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Strips virtual-meeting phrases and collapses whitespace.
///
/// ```
/// use inkcal_core::normalize_location;
///
/// assert_eq!(normalize_location("Microsoft Teams Meeting Room 5"), "Room 5");
/// ```
pub fn normalize_location(location: &str) -> String {
    let stripped = PHRASE_REGEX.replace_all(location, " ");
    WHITESPACE_REGEX
        .replace_all(stripped.trim(), " ")
        .into_owned()
}
