//! Append-only conversation log and context-window selection.

use std::sync::Arc;

use banter_core::domain::Message;

// ── Conversation log ───────────────────────────────────────────────

/// Append-only record of the conversation, oldest entry first.
///
/// Entries are never edited or removed once appended. Trimming history for
/// the generator happens at read time through [`ContextWindow`], so the
/// full transcript always stays available to the UI.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<Message>,
}

impl ConversationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log.
    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// A shareable snapshot of the log at this moment.
    ///
    /// Later appends do not show through the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[Message]> {
        Arc::from(self.entries.as_slice())
    }

    /// Number of entries in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no entries yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Context window ─────────────────────────────────────────────────

/// Policy for how much history accompanies each generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextWindow {
    /// Send the whole conversation.
    #[default]
    Full,

    /// Send only the newest `n` messages.
    RecentMessages(usize),

    /// Send the newest messages whose combined character count fits the
    /// budget. The newest message is always included, even when it alone
    /// exceeds the budget.
    CharBudget(usize),
}

impl ContextWindow {
    /// Select the slice of `entries` this policy sends to the generator.
    ///
    /// Always a suffix of `entries`, so message order is preserved and the
    /// newest entries are the ones kept.
    #[must_use]
    pub fn select(self, entries: &[Message]) -> &[Message] {
        match self {
            Self::Full => entries,
            Self::RecentMessages(n) => {
                let start = entries.len().saturating_sub(n);
                &entries[start..]
            }
            Self::CharBudget(budget) => {
                let mut start = entries.len();
                let mut used = 0usize;
                while start > 0 {
                    let cost = entries[start - 1].content.chars().count();
                    if used + cost > budget && start < entries.len() {
                        break;
                    }
                    used += cost;
                    start -= 1;
                }
                &entries[start..]
            }
        }
    }
}
