use crate::journal_entry::{
    display_date, local_id, word_count, JournalEntry, Origin, Reflection, MIN_WORDS,
};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title cannot be empty!")]
    EmptyTitle,
    #[error("Content cannot be empty!")]
    EmptyContent,
    #[error("Please write at least {minimum} words. You currently have {count} words.")]
    TooFewWords { count: usize, minimum: usize },
    #[error("only local entries can be changed")]
    NotLocal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalStats {
    pub total: usize,
    pub static_entries: usize,
    pub local_entries: usize,
    pub json_entries: usize,
}

/// Canonical entry collections, one per origin.
///
/// The rendered order is fixed: json entries newest-first, then local entries
/// in creation order, then static entries in document order.
#[derive(Debug, Default)]
pub struct JournalState {
    static_entries: Vec<JournalEntry>,
    local_entries: Vec<JournalEntry>,
    /// Kept in file order; reversed when rendered.
    json_entries: Vec<JournalEntry>,
}

impl JournalState {
    pub fn new(static_entries: Vec<JournalEntry>) -> Self {
        let mut state = JournalState::default();
        state.hydrate(Origin::Static, static_entries);
        state
    }

    /// Replaces the working set of one origin and returns how many entries
    /// were kept.
    ///
    /// Json entries whose title matches an existing static or local title are
    /// dropped, as are repeats within the batch (the last occurrence wins).
    pub fn hydrate(&mut self, origin: Origin, entries: Vec<JournalEntry>) -> usize {
        let entries: Vec<JournalEntry> = entries
            .into_iter()
            .map(|mut e| {
                e.origin = origin;
                e
            })
            .collect();

        match origin {
            Origin::Static => {
                let mut seen = HashSet::new();
                self.static_entries = entries
                    .into_iter()
                    .filter(|e| seen.insert(e.title.trim().to_string()))
                    .collect();
                self.static_entries.len()
            }
            Origin::Local => {
                let mut seen = HashSet::new();
                let mut kept = Vec::with_capacity(entries.len());
                for mut entry in entries {
                    let id = match entry.id.take().filter(|id| !id.trim().is_empty()) {
                        Some(id) => id,
                        None => self.fresh_id_among(&kept, Local::now()),
                    };
                    if seen.insert(id.clone()) {
                        entry.id = Some(id);
                        kept.push(entry);
                    }
                }
                self.local_entries = kept;
                info!(count = self.local_entries.len(), "hydrated local entries");
                self.local_entries.len()
            }
            Origin::Json => {
                let existing = self.existing_titles();
                let fetched = entries.len();
                let mut seen = HashSet::new();
                let mut kept: Vec<JournalEntry> = entries
                    .into_iter()
                    .rev()
                    .filter(|e| {
                        let title = e.title.trim().to_string();
                        !existing.contains(&title) && seen.insert(title)
                    })
                    .map(|mut e| {
                        e.id = None;
                        e
                    })
                    .collect();
                kept.reverse();
                self.json_entries = kept;
                info!(
                    fetched,
                    kept = self.json_entries.len(),
                    "hydrated json entries"
                );
                self.json_entries.len()
            }
        }
    }

    pub fn hydrate_reflections(&mut self, reflections: &[Reflection]) -> usize {
        let entries = reflections.iter().map(Reflection::to_entry).collect();
        self.hydrate(Origin::Json, entries)
    }

    /// Validates and appends a new local entry.
    pub fn create_local(
        &mut self,
        title: &str,
        content: &str,
        now: DateTime<Local>,
    ) -> Result<&JournalEntry, ValidationError> {
        let (title, content) = validate(title, content)?;
        let count = word_count(content);
        if count < MIN_WORDS {
            return Err(ValidationError::TooFewWords {
                count,
                minimum: MIN_WORDS,
            });
        }

        let id = self.fresh_id_among(&self.local_entries, now);
        debug!(%id, "creating local entry");
        self.local_entries.push(JournalEntry::new_local(
            id,
            title.to_string(),
            content.to_string(),
            display_date(now),
        ));
        Ok(&self.local_entries[self.local_entries.len() - 1])
    }

    /// Inserts a local entry or replaces the one with the same id. Edits are
    /// not subject to the word minimum.
    pub fn upsert_local(&mut self, mut entry: JournalEntry) -> Result<(), ValidationError> {
        if entry.origin != Origin::Local {
            return Err(ValidationError::NotLocal);
        }
        let (title, content) = {
            let (title, content) = validate(&entry.title, &entry.content)?;
            (title.to_string(), content.to_string())
        };
        entry.title = title;
        entry.content = content;

        let id = match entry.id.clone() {
            Some(id) => id,
            None => {
                let id = self.fresh_id_among(&self.local_entries, Local::now());
                entry.id = Some(id.clone());
                id
            }
        };

        match self
            .local_entries
            .iter_mut()
            .find(|e| e.id.as_deref() == Some(id.as_str()))
        {
            Some(existing) => *existing = entry,
            None => self.local_entries.push(entry),
        }
        Ok(())
    }

    pub fn remove_local(&mut self, id: &str) -> Option<JournalEntry> {
        let index = self
            .local_entries
            .iter()
            .position(|e| e.id.as_deref() == Some(id))?;
        Some(self.local_entries.remove(index))
    }

    pub fn find_local(&self, id: &str) -> Option<&JournalEntry> {
        self.local_entries
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
    }

    /// The complete local collection, ready to be written over the store.
    pub fn snapshot_local(&self) -> Vec<JournalEntry> {
        self.local_entries.clone()
    }

    pub fn rendered(&self) -> Vec<&JournalEntry> {
        self.json_entries
            .iter()
            .rev()
            .chain(self.local_entries.iter())
            .chain(self.static_entries.iter())
            .collect()
    }

    pub fn existing_titles(&self) -> HashSet<String> {
        self.static_entries
            .iter()
            .chain(self.local_entries.iter())
            .map(|e| e.title.trim().to_string())
            .collect()
    }

    pub fn stats(&self) -> JournalStats {
        JournalStats {
            total: self.static_entries.len() + self.local_entries.len() + self.json_entries.len(),
            static_entries: self.static_entries.len(),
            local_entries: self.local_entries.len(),
            json_entries: self.json_entries.len(),
        }
    }

    fn fresh_id_among(&self, taken: &[JournalEntry], now: DateTime<Local>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let candidate = local_id(millis);
            let clash = taken
                .iter()
                .chain(self.local_entries.iter())
                .any(|e| e.id.as_deref() == Some(candidate.as_str()));
            if !clash {
                return candidate;
            }
            millis += 1;
        }
    }
}

fn validate<'a>(title: &'a str, content: &'a str) -> Result<(&'a str, &'a str), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok((title, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ten_words() -> String {
        "word ".repeat(10)
    }

    fn reflection(name: &str, date: &str) -> Reflection {
        Reflection {
            name: name.into(),
            date: date.into(),
            reflection: "hi".into(),
        }
    }

    fn titles(state: &JournalState) -> Vec<String> {
        state.rendered().iter().map(|e| e.title.clone()).collect()
    }

    fn with_static() -> JournalState {
        JournalState::new(vec![
            JournalEntry::new_static("Week 1".into(), "one".into(), "Jan".into()),
            JournalEntry::new_static("Week 2".into(), "two".into(), "Feb".into()),
        ])
    }

    #[test]
    fn create_local_trims_and_assigns_id_and_date() {
        let mut state = JournalState::default();
        let entry = state
            .create_local("  Week 6 ", &format!("  {}  ", ten_words()), now())
            .unwrap()
            .clone();
        assert_eq!(entry.title, "Week 6");
        assert_eq!(entry.content, ten_words().trim());
        assert_eq!(entry.date, "May 1, 2024");
        assert_eq!(entry.id, Some(local_id(now().timestamp_millis())));
        assert!(entry.is_mutable());
    }

    #[test]
    fn create_local_rejects_short_or_empty_input() {
        let mut state = JournalState::default();
        assert_eq!(
            state.create_local("t", "one two three", now()).unwrap_err(),
            ValidationError::TooFewWords {
                count: 3,
                minimum: 10
            }
        );
        assert_eq!(
            state.create_local("   ", &ten_words(), now()).unwrap_err(),
            ValidationError::EmptyTitle
        );
        assert_eq!(
            state.create_local("t", " \n ", now()).unwrap_err(),
            ValidationError::EmptyContent
        );
        assert!(state.snapshot_local().is_empty());
    }

    #[test]
    fn too_few_words_message_reports_count() {
        let err = ValidationError::TooFewWords {
            count: 4,
            minimum: 10,
        };
        assert_eq!(
            err.to_string(),
            "Please write at least 10 words. You currently have 4 words."
        );
    }

    #[test]
    fn ids_stay_unique_within_the_same_millisecond() {
        let mut state = JournalState::default();
        let a = state.create_local("a", &ten_words(), now()).unwrap().id.clone();
        let b = state.create_local("b", &ten_words(), now()).unwrap().id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn upsert_replaces_by_id_without_word_minimum() {
        let mut state = JournalState::default();
        let mut entry = state.create_local("a", &ten_words(), now()).unwrap().clone();
        entry.title = "renamed".into();
        entry.content = "short".into();
        state.upsert_local(entry.clone()).unwrap();

        let snapshot = state.snapshot_local();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "renamed");
        assert_eq!(snapshot[0].content, "short");
        assert_eq!(snapshot[0].id, entry.id);
    }

    #[test]
    fn upsert_rejects_empty_fields_and_leaves_entry_unchanged() {
        let mut state = JournalState::default();
        let original = state.create_local("a", &ten_words(), now()).unwrap().clone();

        let mut edited = original.clone();
        edited.title = "  ".into();
        assert_eq!(
            state.upsert_local(edited).unwrap_err(),
            ValidationError::EmptyTitle
        );

        let mut edited = original.clone();
        edited.content = "".into();
        assert_eq!(
            state.upsert_local(edited).unwrap_err(),
            ValidationError::EmptyContent
        );

        assert_eq!(state.snapshot_local(), vec![original]);
    }

    #[test]
    fn upsert_refuses_non_local_entries() {
        let mut state = JournalState::default();
        let entry = reflection("A", "2024-01-01").to_entry();
        assert_eq!(
            state.upsert_local(entry).unwrap_err(),
            ValidationError::NotLocal
        );
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let mut state = JournalState::default();
        state.create_local("a", &ten_words(), now()).unwrap();
        assert!(state.remove_local("entry-nope").is_none());
        assert_eq!(state.snapshot_local().len(), 1);
    }

    #[test]
    fn remove_local_drops_the_matching_entry() {
        let mut state = JournalState::default();
        let id = state
            .create_local("a", &ten_words(), now())
            .unwrap()
            .id
            .clone()
            .unwrap();
        let removed = state.remove_local(&id).unwrap();
        assert_eq!(removed.title, "a");
        assert!(state.snapshot_local().is_empty());
    }

    #[test]
    fn rendered_order_is_json_reversed_then_local_then_static() {
        let mut state = with_static();
        state.create_local("L1", &ten_words(), now()).unwrap();
        state.create_local("L2", &ten_words(), now()).unwrap();
        state.hydrate_reflections(&[reflection("A", "d1"), reflection("B", "d2")]);

        assert_eq!(
            titles(&state),
            vec![
                "Python Entry: d2 - B",
                "Python Entry: d1 - A",
                "L1",
                "L2",
                "Week 1",
                "Week 2",
            ]
        );
    }

    #[test]
    fn json_hydration_skips_titles_already_present() {
        let mut state = JournalState::new(vec![JournalEntry::new_static(
            "Python Entry: 2024-01-01 - A".into(),
            "static copy".into(),
            "Jan".into(),
        )]);
        state.create_local("Python Entry: d - L", &ten_words(), now()).unwrap();

        let kept = state.hydrate_reflections(&[
            reflection("A", "2024-01-01"),
            reflection("L", "d"),
            reflection("B", "2024-01-02"),
        ]);
        assert_eq!(kept, 1);

        let rendered = state.rendered();
        let json: Vec<_> = rendered.iter().filter(|e| e.origin == Origin::Json).collect();
        assert_eq!(json.len(), 1);
        assert_eq!(json[0].title, "Python Entry: 2024-01-02 - B");

        let mut seen = HashSet::new();
        for entry in rendered {
            assert!(seen.insert(entry.title.clone()), "duplicate {}", entry.title);
        }
    }

    #[test]
    fn repeated_hydration_never_duplicates_json_entries() {
        let mut state = with_static();
        let fetched = [reflection("A", "2024-01-01")];
        state.hydrate_reflections(&fetched);
        state.hydrate_reflections(&fetched);
        assert_eq!(state.stats().json_entries, 1);
        assert_eq!(
            titles(&state).iter().filter(|t| *t == "Python Entry: 2024-01-01 - A").count(),
            1
        );
    }

    #[test]
    fn duplicate_pairs_within_a_batch_keep_the_last_occurrence() {
        let mut state = JournalState::default();
        let mut newer = reflection("A", "d");
        newer.reflection = "second".into();
        state.hydrate_reflections(&[reflection("A", "d"), reflection("B", "d"), newer]);

        // rendered newest-first: the later "A" sits above "B"
        let rendered = state.rendered();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].content, "second");
        assert_eq!(rendered[1].title, "Python Entry: d - B");
    }

    #[test]
    fn local_hydration_fills_missing_ids_and_drops_repeats() {
        let mut state = JournalState::default();
        let mut no_id = JournalEntry::new_local("x".into(), "a".into(), "c".into(), "d".into());
        no_id.id = None;
        let first = JournalEntry::new_local("entry-1".into(), "b".into(), "c".into(), "d".into());
        let repeat = JournalEntry::new_local("entry-1".into(), "c".into(), "c".into(), "d".into());

        assert_eq!(state.hydrate(Origin::Local, vec![no_id, first, repeat]), 2);
        let snapshot = state.snapshot_local();
        assert!(snapshot[0].id.as_deref().unwrap().starts_with("entry-"));
        assert_eq!(snapshot[1].title, "b");
    }

    #[test]
    fn stats_count_every_origin() {
        let mut state = with_static();
        state.create_local("L", &ten_words(), now()).unwrap();
        state.hydrate_reflections(&[reflection("A", "d")]);
        assert_eq!(
            state.stats(),
            JournalStats {
                total: 4,
                static_entries: 2,
                local_entries: 1,
                json_entries: 1,
            }
        );
    }
}
