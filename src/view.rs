//! Per-entry interaction state.
//!
//! Entries are collapsed or expanded. Local entries also move through
//! `Display -> Editing -> Display` and, for deletion,
//! `Display -> PendingDelete -> Processing -> Removing -> (gone)`.
//! Cancelling a pending delete returns to `Display`; once processing has
//! started the deletion runs to completion.

use crate::config::Timings;
use crate::journal_entry::{word_count, EntryKey, JournalEntry};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
}

impl Field {
    pub fn next(self) -> Field {
        match self {
            Field::Title => Field::Content,
            Field::Content => Field::Title,
        }
    }
}

/// Title and body being typed, used by the new-entry form and by edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffers {
    pub title: String,
    pub content: String,
    pub focus: Field,
}

impl TextBuffers {
    pub fn empty() -> Self {
        TextBuffers {
            title: String::new(),
            content: String::new(),
            focus: Field::Title,
        }
    }

    pub fn from_entry(entry: &JournalEntry) -> Self {
        TextBuffers {
            title: entry.title.clone(),
            content: entry.content.clone(),
            focus: Field::Title,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Title => &mut self.title,
            Field::Content => &mut self.content,
        }
    }

    pub fn push(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    /// Newlines only go into the body; in the title Enter moves focus.
    pub fn newline(&mut self) {
        match self.focus {
            Field::Title => self.focus = Field::Content,
            Field::Content => self.content.push('\n'),
        }
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMode {
    Display,
    Editing(TextBuffers),
    PendingDelete,
    Processing { since: Instant },
    Removing { since: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub expanded: bool,
    pub mode: EntryMode,
}

impl Default for EntryView {
    fn default() -> Self {
        EntryView {
            expanded: false,
            mode: EntryMode::Display,
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewState {
    entries: HashMap<EntryKey, EntryView>,
}

impl ViewState {
    /// Re-attaches state to the freshly rendered list. Every entry comes back
    /// collapsed except one being edited; edit buffers and running deletions
    /// survive for entries that are still present.
    pub fn rebuild<'a>(&mut self, rendered: impl IntoIterator<Item = &'a JournalEntry>) {
        let mut next = HashMap::new();
        for entry in rendered {
            let key = entry.key();
            let mut view = self.entries.remove(&key).unwrap_or_default();
            view.expanded = matches!(view.mode, EntryMode::Editing(_));
            next.insert(key, view);
        }
        self.entries = next;
    }

    pub fn get(&self, key: &EntryKey) -> EntryView {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    pub fn get_mut(&mut self, key: &EntryKey) -> &mut EntryView {
        self.entries.entry(key.clone()).or_default()
    }

    pub fn toggle(&mut self, key: &EntryKey) -> bool {
        let view = self.get_mut(key);
        view.expanded = !view.expanded;
        view.expanded
    }

    pub fn editing(&self) -> Option<(&EntryKey, &TextBuffers)> {
        self.entries.iter().find_map(|(key, view)| match &view.mode {
            EntryMode::Editing(buffers) => Some((key, buffers)),
            _ => None,
        })
    }

    pub fn pending_delete(&self) -> Option<&EntryKey> {
        self.entries
            .iter()
            .find(|(_, view)| view.mode == EntryMode::PendingDelete)
            .map(|(key, _)| key)
    }

    /// Advances running deletions and returns the entries whose removal
    /// animation has finished.
    pub fn tick(&mut self, now: Instant, timings: &Timings) -> Vec<EntryKey> {
        let mut finished = Vec::new();
        for (key, view) in self.entries.iter_mut() {
            match view.mode {
                EntryMode::Processing { since }
                    if now.duration_since(since) >= timings.delete_processing =>
                {
                    debug!(entry = %key.ident, "delete processing done, removing");
                    view.mode = EntryMode::Removing { since: now };
                }
                EntryMode::Removing { since }
                    if now.duration_since(since) >= timings.removal_animation =>
                {
                    finished.push(key.clone());
                }
                _ => {}
            }
        }
        for key in &finished {
            self.entries.remove(key);
        }
        finished
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Auto-dismissing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub shown_at: Instant,
}

impl Notice {
    pub fn success(message: impl Into<String>, now: Instant) -> Self {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
            shown_at: now,
        }
    }

    pub fn error(message: impl Into<String>, now: Instant) -> Self {
        Notice {
            kind: NoticeKind::Error,
            message: message.into(),
            shown_at: now,
        }
    }

    pub fn expired(&self, now: Instant, timings: &Timings) -> bool {
        now.duration_since(self.shown_at) >= timings.notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal_entry::Reflection;
    use std::time::Duration;

    fn local(id: &str, title: &str) -> JournalEntry {
        JournalEntry::new_local(id.into(), title.into(), "body".into(), "d".into())
    }

    #[test]
    fn buffers_route_keys_to_the_focused_field() {
        let mut buffers = TextBuffers::empty();
        buffers.push('H');
        buffers.push('i');
        buffers.newline();
        assert_eq!(buffers.focus, Field::Content);
        for c in "one two".chars() {
            buffers.push(c);
        }
        buffers.newline();
        buffers.push('x');
        buffers.backspace();
        assert_eq!(buffers.title, "Hi");
        assert_eq!(buffers.content, "one two\n");
        assert_eq!(buffers.word_count(), 2);
        buffers.cycle_focus();
        assert_eq!(buffers.focus, Field::Title);
    }

    #[test]
    fn rebuild_collapses_everything_and_keeps_modes() {
        let a = local("entry-1", "a");
        let b = Reflection {
            name: "n".into(),
            date: "d".into(),
            reflection: "r".into(),
        }
        .to_entry();
        let mut view = ViewState::default();
        view.rebuild([&a, &b]);
        assert!(view.toggle(&a.key()));
        view.get_mut(&a.key()).mode = EntryMode::PendingDelete;
        view.toggle(&b.key());

        view.rebuild([&a]);
        assert_eq!(
            view.get(&a.key()),
            EntryView {
                expanded: false,
                mode: EntryMode::PendingDelete
            }
        );
        assert_eq!(view.pending_delete(), Some(&a.key()));
        assert_eq!(view.get(&b.key()), EntryView::default());
    }

    #[test]
    fn rebuild_keeps_the_edited_entry_open() {
        let a = local("entry-1", "a");
        let mut view = ViewState::default();
        view.rebuild([&a]);
        let state = view.get_mut(&a.key());
        state.mode = EntryMode::Editing(TextBuffers::from_entry(&a));
        state.expanded = true;

        view.rebuild([&a]);
        assert!(view.get(&a.key()).expanded);
        assert!(view.editing().is_some());
    }

    #[test]
    fn deletion_walks_through_processing_and_removal() {
        let timings = Timings {
            delete_processing: Duration::from_millis(1000),
            removal_animation: Duration::from_millis(500),
            notification: Duration::from_millis(3000),
        };
        let a = local("entry-1", "a");
        let mut view = ViewState::default();
        view.rebuild([&a]);

        let start = Instant::now();
        view.get_mut(&a.key()).mode = EntryMode::Processing { since: start };

        assert!(view.tick(start + Duration::from_millis(999), &timings).is_empty());
        assert!(view.tick(start + Duration::from_millis(1000), &timings).is_empty());
        assert!(matches!(view.get(&a.key()).mode, EntryMode::Removing { .. }));

        assert!(view.tick(start + Duration::from_millis(1400), &timings).is_empty());
        assert_eq!(
            view.tick(start + Duration::from_millis(1500), &timings),
            vec![a.key()]
        );
    }

    #[test]
    fn notices_expire_after_their_duration() {
        let timings = Timings::default();
        let now = Instant::now();
        let notice = Notice::success("saved", now);
        assert!(!notice.expired(now + Duration::from_millis(2999), &timings));
        assert!(notice.expired(now + Duration::from_millis(3000), &timings));
    }
}
