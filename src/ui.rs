use crate::app::{Action, App, InputMode, Panel};
use crate::journal_entry::{JournalEntry, Origin};
use crate::storage::Theme;
use crate::view::{EntryMode, EntryView, Field, NoticeKind, TextBuffers};
use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::Duration,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI { terminal })
    }

    pub fn display(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|f| draw(f, app))?;
        Ok(())
    }

    /// Waits briefly for a key press and maps it to an action for the
    /// current input mode.
    pub fn handle_input(&self, app: &App) -> Result<Option<Action>> {
        if !event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Ok(key_action(app.input_mode(), key))
            }
            _ => Ok(None),
        }
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

pub fn key_action(mode: InputMode, key: KeyEvent) -> Option<Action> {
    let ctrl_s = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s');
    match mode {
        InputMode::Alert => match key.code {
            KeyCode::Enter | KeyCode::Esc => Some(Action::DismissAlert),
            _ => None,
        },
        InputMode::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(Action::ConfirmDelete),
            KeyCode::Char('n') | KeyCode::Esc => Some(Action::CancelDelete),
            _ => None,
        },
        InputMode::Form | InputMode::Editing => {
            let (submit, leave) = if mode == InputMode::Form {
                (Action::SubmitForm, Action::CloseForm)
            } else {
                (Action::SaveEdit, Action::CancelEdit)
            };
            if ctrl_s {
                return Some(submit);
            }
            match key.code {
                KeyCode::Esc => Some(leave),
                KeyCode::Tab => Some(Action::NextField),
                KeyCode::Enter => Some(Action::Newline),
                KeyCode::Backspace => Some(Action::Backspace),
                KeyCode::Char(c) => Some(Action::Type(c)),
                _ => None,
            }
        }
        InputMode::Panel => match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(Action::ClosePanel),
            _ => None,
        },
        InputMode::Browse => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectPrevious),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectNext),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Toggle),
            KeyCode::Char('n') => Some(Action::OpenForm),
            KeyCode::Char('e') => Some(Action::BeginEdit),
            KeyCode::Char('d') => Some(Action::RequestDelete),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('x') => Some(Action::Export),
            KeyCode::Char('t') => Some(Action::ToggleTheme),
            KeyCode::Char('s') => Some(Action::ShowPanel(Panel::Stats)),
            KeyCode::Char('b') => Some(Action::ShowPanel(Panel::Backend)),
            KeyCode::Char('i') => Some(Action::ShowPanel(Panel::Storage)),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        },
    }
}

struct Palette {
    accent: Color,
    json: Color,
    local: Color,
    hint: Color,
    base: Style,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            accent: Color::Cyan,
            json: Color::Green,
            local: Color::Blue,
            hint: Color::Yellow,
            base: Style::default(),
        },
        Theme::Dark => Palette {
            accent: Color::LightCyan,
            json: Color::LightGreen,
            local: Color::LightBlue,
            hint: Color::LightYellow,
            base: Style::default().bg(Color::Black).fg(Color::Gray),
        },
    }
}

/// Renders the whole journal screen. This is the only place that lays out
/// entry headers, so every entry gets the same title / spacer / actions shape.
pub fn draw(f: &mut Frame, app: &App) {
    let colors = palette(app.theme());
    f.render_widget(Block::default().style(colors.base), f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(f.area());

    let title = Paragraph::new("Reflection Journal")
        .style(Style::default().fg(colors.accent).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    draw_entries(f, app, &colors, chunks[1]);
    draw_notice(f, app, chunks[2]);
    draw_controls(f, app, &colors, chunks[3]);

    if let Some(form) = app.form() {
        draw_form(f, form, &colors);
    }
    if let Some(panel) = app.panel() {
        draw_panel(f, app, panel, &colors);
    }
    if let Some(entry) = app.pending_delete() {
        draw_confirm(f, &entry.title);
    }
    if let Some(message) = app.alert() {
        draw_alert(f, message);
    }
}

fn draw_entries(f: &mut Frame, app: &App, colors: &Palette, area: Rect) {
    // borders and the highlight symbol
    let inner_width = usize::from(area.width.saturating_sub(4));
    let rendered = app.rendered();

    let items: Vec<ListItem> = rendered
        .iter()
        .map(|entry| {
            let view = app.entry_view(entry);
            ListItem::new(entry_lines(entry, &view, inner_width, colors))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("journal-entries"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let selected = (!rendered.is_empty()).then_some(app.selected());
    f.render_stateful_widget(list, area, &mut ListState::default().with_selected(selected));
}

/// Header text and action cluster for one entry.
pub fn header_parts(entry: &JournalEntry, view: &EntryView) -> (String, Vec<String>) {
    let title = match &view.mode {
        EntryMode::Editing(buffers) => format!("{}{}", buffers.title, cursor(buffers, Field::Title)),
        _ => entry.title.clone(),
    };

    let mut actions = vec![if view.expanded { "▲" } else { "▼" }.to_string()];
    if entry.is_mutable() {
        match &view.mode {
            EntryMode::Editing(_) => actions.push("[💾 Save]".into()),
            EntryMode::Processing { .. } | EntryMode::Removing { .. } => {
                actions.push("[⏳ Deleting...]".into())
            }
            _ => {
                actions.push("[✏️ Edit]".into());
                actions.push("[🗑️ Delete]".into());
            }
        }
    }
    (title, actions)
}

fn entry_lines(
    entry: &JournalEntry,
    view: &EntryView,
    width: usize,
    colors: &Palette,
) -> Vec<Line<'static>> {
    let (title, actions) = header_parts(entry, view);
    let actions = actions.join(" ");
    let actions_width = actions.width();
    let title = truncate_to_width(&title, width.saturating_sub(actions_width + 1));
    let spacer = width.saturating_sub(title.width() + actions_width).max(1);

    let title_color = match entry.origin {
        Origin::Json => colors.json,
        Origin::Local => colors.local,
        Origin::Static => colors.accent,
    };
    let mut title_style = Style::default().fg(title_color).add_modifier(Modifier::BOLD);
    if matches!(view.mode, EntryMode::Removing { .. }) {
        title_style = title_style.add_modifier(Modifier::DIM | Modifier::CROSSED_OUT);
    }

    let mut lines = vec![Line::from(vec![
        Span::styled(title, title_style),
        Span::raw(" ".repeat(spacer)),
        Span::styled(actions, Style::default().fg(colors.hint)),
    ])];

    if !view.expanded {
        return lines;
    }

    lines.push(Line::from(Span::styled(
        format!("  {}", entry.meta_line()),
        Style::default().add_modifier(Modifier::ITALIC),
    )));
    let content = match &view.mode {
        EntryMode::Editing(buffers) => {
            format!("{}{}", buffers.content, cursor(buffers, Field::Content))
        }
        _ => entry.content.clone(),
    };
    for line in content.split('\n') {
        lines.push(Line::from(format!("  {line}")));
    }
    if entry.origin == Origin::Json {
        lines.push(Line::from(Span::styled(
            "  💡 This entry was added using the Python script and stored in reflections.json",
            Style::default().fg(colors.json),
        )));
    }
    lines.push(Line::from(""));
    lines
}

fn cursor(buffers: &TextBuffers, field: Field) -> &'static str {
    if buffers.focus == field {
        "|"
    } else {
        ""
    }
}

pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    if max > 0 {
        out.push('…');
    }
    out
}

fn draw_notice(f: &mut Frame, app: &App, area: Rect) {
    let Some(notice) = app.notice() else {
        return;
    };
    let (prefix, color) = match notice.kind {
        NoticeKind::Success => ("✅", Color::Green),
        NoticeKind::Error => ("❌", Color::Red),
    };
    let line = Paragraph::new(format!("{prefix} {}", notice.message))
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(line, area);
}

fn draw_controls(f: &mut Frame, app: &App, colors: &Palette, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::BOLD));
    let text = match app.input_mode() {
        InputMode::Form | InputMode::Editing => Line::from(vec![
            key("Tab"),
            Span::raw(" switch field, "),
            key("Ctrl-S"),
            Span::raw(" save, "),
            key("Esc"),
            Span::raw(" cancel"),
        ]),
        _ => Line::from(vec![
            key("n"),
            Span::raw(" new, "),
            key("Enter"),
            Span::raw(" expand, "),
            key("e"),
            Span::raw(" edit, "),
            key("d"),
            Span::raw(" delete, "),
            key("r"),
            Span::raw(" refresh, "),
            key("x"),
            Span::raw(" export, "),
            key("t"),
            Span::raw(" theme, "),
            key("s/b/i"),
            Span::raw(" info, "),
            key("q"),
            Span::raw(" quit"),
        ]),
    };
    let controls = Paragraph::new(text)
        .style(Style::default().fg(colors.hint))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(controls, area);
}

fn draw_form(f: &mut Frame, form: &TextBuffers, colors: &Palette) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("New Journal Entry");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let title = Paragraph::new(format!("{}{}", form.title, cursor(form, Field::Title)))
        .block(Block::default().borders(Borders::ALL).title("Title"));
    f.render_widget(title, chunks[0]);

    let body = Paragraph::new(format!("{}{}", form.content, cursor(form, Field::Content)))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Entry"));
    f.render_widget(body, chunks[1]);

    let count = form.word_count();
    let count_color = if count >= crate::journal_entry::MIN_WORDS {
        colors.json
    } else {
        colors.hint
    };
    let counter = Paragraph::new(format!(
        "{count} words (minimum {})",
        crate::journal_entry::MIN_WORDS
    ))
    .style(Style::default().fg(count_color))
    .alignment(Alignment::Right);
    f.render_widget(counter, chunks[2]);
}

fn draw_panel(f: &mut Frame, app: &App, panel: Panel, colors: &Palette) {
    let stats = app.stats();
    let (title, lines): (&str, Vec<Line>) = match panel {
        Panel::Stats => (
            "📊 Reflection Statistics",
            vec![
                Line::from(format!("Total Entries: {}", stats.total)),
                Line::from(format!("Course Weeks:  {}", stats.static_entries)),
                Line::from(format!("Local Entries: {}", stats.local_entries)),
                Line::from(format!("JSON Entries:  {}", stats.json_entries)),
                Line::from(""),
                Line::from("💡 JSON entries are managed by Python backend"),
            ],
        ),
        Panel::Backend => (
            "🔧 Backend Information",
            vec![
                Line::from(format!("Total Entries:  {}", stats.total)),
                Line::from(format!("JSON Entries:   {}", stats.json_entries)),
                Line::from(format!("Local Entries:  {}", stats.local_entries)),
                Line::from(format!("Static Entries: {}", stats.static_entries)),
                Line::from(""),
                Line::from(format!("JSON File: {}", app.remote_label())),
                Line::from("Run the offline script to add reflections, then press r to refresh."),
            ],
        ),
        Panel::Storage => {
            let info = app.storage_info();
            (
                "💾 Storage",
                vec![
                    Line::from(format!("Current Theme:       {}", info.theme.as_str())),
                    Line::from(format!("Saved Local Entries: {}", info.saved_entries)),
                    Line::from(format!("Storage Used:        {} KB", info.usage_label())),
                    Line::from(format!("JSON Entries:        {}", stats.json_entries)),
                ],
            )
        }
    };

    let area = centered_rect(60, 50, f.area());
    f.render_widget(Clear, area);
    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(colors.accent)),
        );
    f.render_widget(panel, area);
}

fn draw_confirm(f: &mut Frame, title: &str) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let dialog = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("\"{title}\""),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("Are you sure you want to delete this journal entry? This action cannot be undone and the entry will be permanently removed."),
        Line::from(""),
        Line::from(vec![
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" ↩️ Keep Entry    "),
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" 🗑️ Delete Permanently"),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("🗑️ Delete Journal Entry")
            .border_style(Style::default().fg(Color::Red)),
    );
    f.render_widget(dialog, area);
}

fn draw_alert(f: &mut Frame, message: &str) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);
    let alert = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to continue",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ])
    .wrap(Wrap { trim: true })
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Alert")
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(alert, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
