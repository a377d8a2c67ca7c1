//! Text cleanup applied to reply text before it reaches speech synthesis.

/// Strip `text` down to characters that read safely aloud.
///
/// Keeps ASCII letters and digits, spaces, and the punctuation marks
/// `. , ? ! '`. Everything else is removed: markdown markers, emoji,
/// and non-ASCII scripts all confuse synthesis voices more than they help.
#[must_use]
pub fn sanitize_for_speech(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || ".,?!'".contains(*c))
        .collect()
}
