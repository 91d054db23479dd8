use crate::config::Timings;
use crate::journal_entry::{EntryKey, JournalEntry, Origin, Reflection};
use crate::journal_state::{JournalState, JournalStats, ValidationError};
use crate::remote::{export_snapshot, FetchCoordinator, FetchKind, FetchOutcome};
use crate::storage::{Persistence, StorageInfo, Theme};
use crate::view::{EntryMode, EntryView, Field, Notice, TextBuffers, ViewState};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// User commands, already resolved against the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectPrevious,
    SelectNext,
    Toggle,
    OpenForm,
    CloseForm,
    SubmitForm,
    BeginEdit,
    SaveEdit,
    CancelEdit,
    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    Type(char),
    Newline,
    Backspace,
    NextField,
    DismissAlert,
    Refresh,
    Export,
    ToggleTheme,
    ShowPanel(Panel),
    ClosePanel,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Stats,
    Backend,
    Storage,
}

/// Which part of the screen currently receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Browse,
    Form,
    Editing,
    ConfirmDelete,
    Alert,
    Panel,
}

pub struct App {
    state: JournalState,
    persistence: Persistence,
    fetcher: FetchCoordinator,
    view: ViewState,
    selected: usize,
    form: Option<TextBuffers>,
    alert: Option<String>,
    panel: Option<Panel>,
    notice: Option<Notice>,
    theme: Theme,
    last_fetched: Vec<Reflection>,
    export_dir: PathBuf,
    timings: Timings,
    quit: bool,
}

impl App {
    /// Restores local entries and the theme; the remote fetch is started
    /// separately with [`App::start_initial_fetch`].
    pub fn new(
        static_entries: Vec<JournalEntry>,
        persistence: Persistence,
        fetcher: FetchCoordinator,
        export_dir: PathBuf,
        timings: Timings,
    ) -> Self {
        let mut state = JournalState::new(static_entries);
        state.hydrate(Origin::Local, persistence.load_local());
        let theme = persistence.load_theme();

        let mut app = App {
            state,
            persistence,
            fetcher,
            view: ViewState::default(),
            selected: 0,
            form: None,
            alert: None,
            panel: None,
            notice: None,
            theme,
            last_fetched: Vec::new(),
            export_dir,
            timings,
            quit: false,
        };
        app.rebuild_view(None);
        app
    }

    pub fn start_initial_fetch(&mut self) {
        self.fetcher.start(FetchKind::Initial);
    }

    pub fn rendered(&self) -> Vec<&JournalEntry> {
        self.state.rendered()
    }

    pub fn entry_view(&self, entry: &JournalEntry) -> EntryView {
        self.view.get(&entry.key())
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&JournalEntry> {
        self.state.rendered().get(self.selected).copied()
    }

    pub fn form(&self) -> Option<&TextBuffers> {
        self.form.as_ref()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn panel(&self) -> Option<Panel> {
        self.panel
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn stats(&self) -> JournalStats {
        self.state.stats()
    }

    pub fn storage_info(&self) -> StorageInfo {
        self.persistence.storage_info()
    }

    pub fn remote_label(&self) -> String {
        self.fetcher.source().to_string()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Entry awaiting delete confirmation.
    pub fn pending_delete(&self) -> Option<&JournalEntry> {
        let key = self.view.pending_delete()?;
        self.state.rendered().into_iter().find(|e| &e.key() == key)
    }

    pub fn input_mode(&self) -> InputMode {
        if self.alert.is_some() {
            InputMode::Alert
        } else if self.view.pending_delete().is_some() {
            InputMode::ConfirmDelete
        } else if self.form.is_some() {
            InputMode::Form
        } else if self.view.editing().is_some() {
            InputMode::Editing
        } else if self.panel.is_some() {
            InputMode::Panel
        } else {
            InputMode::Browse
        }
    }

    pub fn apply(&mut self, action: Action, now: Instant, clock: DateTime<Local>) {
        debug!(?action, "applying action");
        match action {
            Action::SelectPrevious => self.selected = self.selected.saturating_sub(1),
            Action::SelectNext => {
                let len = self.state.rendered().len();
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            Action::Toggle => self.toggle_selected(),
            Action::OpenForm => {
                if self.form.is_none() {
                    self.form = Some(TextBuffers::empty());
                }
            }
            Action::CloseForm => self.form = None,
            Action::SubmitForm => self.submit_form(now, clock),
            Action::BeginEdit => self.begin_edit(),
            Action::SaveEdit => self.save_edit(now),
            Action::CancelEdit => self.cancel_edit(),
            Action::RequestDelete => self.request_delete(),
            Action::ConfirmDelete => self.confirm_delete(now),
            Action::CancelDelete => self.cancel_delete(),
            Action::Type(c) => self.with_buffers(|b| b.push(c)),
            Action::Newline => self.with_buffers(TextBuffers::newline),
            Action::Backspace => self.with_buffers(TextBuffers::backspace),
            Action::NextField => self.with_buffers(TextBuffers::cycle_focus),
            Action::DismissAlert => self.alert = None,
            Action::Refresh => self.refresh(),
            Action::Export => self.export(now),
            Action::ToggleTheme => self.toggle_theme(now),
            Action::ShowPanel(panel) => self.panel = Some(panel),
            Action::ClosePanel => self.panel = None,
            Action::Quit => self.quit = true,
        }
    }

    /// Applies finished fetches and advances timers.
    pub fn tick(&mut self, now: Instant) {
        while let Some(outcome) = self.fetcher.poll() {
            self.handle_fetch(outcome, now);
        }

        for key in self.view.tick(now, &self.timings) {
            self.finish_delete(&key, now);
        }

        if self
            .notice
            .as_ref()
            .is_some_and(|n| n.expired(now, &self.timings))
        {
            self.notice = None;
        }
    }

    pub fn handle_fetch(&mut self, outcome: FetchOutcome, now: Instant) {
        let selected = self.selected_entry().map(JournalEntry::key);
        match (outcome.kind, outcome.result) {
            (kind, Ok(reflections)) => {
                self.state.hydrate_reflections(&reflections);
                self.last_fetched = reflections;
                self.rebuild_view(selected);
                if kind == FetchKind::Refresh {
                    self.notice = Some(Notice::success(
                        format!(
                            "JSON data refreshed! Loaded {} entries from backend.",
                            self.last_fetched.len()
                        ),
                        now,
                    ));
                }
            }
            (FetchKind::Initial, Err(err)) => {
                warn!(error = %err, "error fetching json reflections, showing none");
                self.state.hydrate_reflections(&[]);
                self.last_fetched.clear();
                self.rebuild_view(selected);
            }
            (FetchKind::Refresh, Err(err)) => {
                error!(error = %err, "error refreshing json data");
                self.notice = Some(Notice::error(
                    format!("Error refreshing JSON data: {err}"),
                    now,
                ));
            }
        }
    }

    fn refresh(&mut self) {
        let generation = self.fetcher.start(FetchKind::Refresh);
        info!(generation, "refreshing json data");
    }

    fn export(&mut self, now: Instant) {
        self.notice = Some(match export_snapshot(&self.last_fetched, &self.export_dir) {
            Ok(path) => Notice::success(
                format!("JSON data exported successfully! ({})", path.display()),
                now,
            ),
            Err(err) => {
                error!(error = %err, "export failed");
                Notice::error(format!("Export failed: {err}"), now)
            }
        });
    }

    fn toggle_theme(&mut self, now: Instant) {
        self.theme = self.theme.toggled();
        if let Err(err) = self.persistence.save_theme(self.theme) {
            error!(error = %err, "could not save theme");
            self.notice = Some(Notice::error(format!("Could not save theme: {err}"), now));
        }
    }

    fn toggle_selected(&mut self) {
        if let Some(key) = self.selected_entry().map(JournalEntry::key) {
            let expanded = self.view.toggle(&key);
            debug!(entry = %key.ident, expanded, "toggled entry");
        }
    }

    fn with_buffers(&mut self, edit: impl FnOnce(&mut TextBuffers)) {
        if let Some(form) = self.form.as_mut() {
            edit(form);
            return;
        }
        let key = match self.view.editing() {
            Some((key, _)) => key.clone(),
            None => return,
        };
        if let EntryMode::Editing(buffers) = &mut self.view.get_mut(&key).mode {
            edit(buffers);
        }
    }

    fn submit_form(&mut self, now: Instant, clock: DateTime<Local>) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let previous = self.state.snapshot_local();
        let created = self
            .state
            .create_local(&form.title, &form.content, clock)
            .map(|e| e.key());

        match created {
            Ok(key) => {
                if !self.persist_or_rollback(previous, now) {
                    return;
                }
                self.form = None;
                self.rebuild_view(Some(key));
                self.notice = Some(Notice::success("Journal entry added successfully!", now));
            }
            Err(err) => {
                form.focus = match err {
                    ValidationError::EmptyTitle => Field::Title,
                    _ => Field::Content,
                };
                self.alert = Some(err.to_string());
            }
        }
    }

    fn begin_edit(&mut self) {
        let Some(entry) = self.selected_entry().cloned() else {
            return;
        };
        if !entry.is_mutable() {
            return;
        }
        let view = self.view.get_mut(&entry.key());
        if view.mode == EntryMode::Display {
            view.mode = EntryMode::Editing(TextBuffers::from_entry(&entry));
            view.expanded = true;
        }
    }

    fn save_edit(&mut self, now: Instant) {
        let Some((key, buffers)) = self.view.editing().map(|(k, b)| (k.clone(), b.clone())) else {
            return;
        };
        let Some(mut entry) = self.state.find_local(&key.ident).cloned() else {
            return;
        };
        entry.title = buffers.title.clone();
        entry.content = buffers.content.clone();

        let previous = self.state.snapshot_local();
        if let Err(err) = self.state.upsert_local(entry) {
            if let EntryMode::Editing(b) = &mut self.view.get_mut(&key).mode {
                b.focus = match err {
                    ValidationError::EmptyTitle => Field::Title,
                    _ => Field::Content,
                };
            }
            self.alert = Some(err.to_string());
            return;
        }
        if !self.persist_or_rollback(previous, now) {
            return;
        }
        self.view.get_mut(&key).mode = EntryMode::Display;
        self.notice = Some(Notice::success("Journal entry updated successfully!", now));
    }

    fn cancel_edit(&mut self) {
        if let Some(key) = self.view.editing().map(|(k, _)| k.clone()) {
            self.view.get_mut(&key).mode = EntryMode::Display;
        }
    }

    fn request_delete(&mut self) {
        let Some(key) = self
            .selected_entry()
            .filter(|e| e.is_mutable())
            .map(JournalEntry::key)
        else {
            return;
        };
        let view = self.view.get_mut(&key);
        if view.mode == EntryMode::Display {
            view.mode = EntryMode::PendingDelete;
        }
    }

    fn confirm_delete(&mut self, now: Instant) {
        if let Some(key) = self.view.pending_delete().cloned() {
            info!(entry = %key.ident, "deleting entry");
            self.view.get_mut(&key).mode = EntryMode::Processing { since: now };
        }
    }

    fn cancel_delete(&mut self) {
        if let Some(key) = self.view.pending_delete().cloned() {
            self.view.get_mut(&key).mode = EntryMode::Display;
        }
    }

    fn finish_delete(&mut self, key: &EntryKey, now: Instant) {
        let selected = self.selected_entry().map(JournalEntry::key);
        let previous = self.state.snapshot_local();
        if self.state.remove_local(&key.ident).is_none() {
            return;
        }
        if self.persist_or_rollback(previous, now) {
            self.notice = Some(Notice::success("Journal entry deleted successfully!", now));
        }
        self.rebuild_view(selected);
    }

    /// Writes the local collection. When the write fails the store goes back
    /// to `previous` so memory never runs ahead of the durable copy.
    fn persist_or_rollback(&mut self, previous: Vec<JournalEntry>, now: Instant) -> bool {
        match self.persistence.save_local(&self.state.snapshot_local()) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "could not save journal entries");
                self.state.hydrate(Origin::Local, previous);
                self.notice = Some(Notice::error(
                    format!("Could not save journal entries: {err}"),
                    now,
                ));
                false
            }
        }
    }

    /// Re-attaches view state after the rendered list changed. The selection
    /// follows `keep` when that entry is still rendered, otherwise it stays at
    /// the same index.
    fn rebuild_view(&mut self, keep: Option<EntryKey>) {
        let rendered = self.state.rendered();
        self.view.rebuild(rendered.iter().copied());
        let kept = keep.and_then(|key| rendered.iter().position(|e| e.key() == key));
        self.selected = kept.unwrap_or_else(|| self.selected.min(rendered.len().saturating_sub(1)));
    }
}
