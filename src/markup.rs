//! HTML rendering of the journal.
//!
//! Attribute surface per entry: `data-entry-id`, `data-is-new` and, for
//! backend entries only, `data-source="json"`. Headers are always
//! `h2` / `.header-spacer` / `.entry-actions`.

use crate::journal_entry::{JournalEntry, Origin};
use crate::journal_state::JournalState;
use maud::{html, Markup, DOCTYPE};

pub const CONTAINER_ID: &str = "journal-entries-container";

pub fn render_page(state: &JournalState) -> Markup {
    let stats = state.stats();
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Journal" }
            }
            body {
                main.container {
                    h1 { "Journal" }
                    div #"reflection-counter-container" {
                        div.reflection-counter {
                            span.counter-number { (stats.total) } " total, "
                            span.counter-number { (stats.static_entries) } " course weeks, "
                            span.counter-number { (stats.local_entries) } " local, "
                            span.counter-number { (stats.json_entries) } " json"
                        }
                    }
                    (render_entries(state))
                }
            }
        }
    }
}

pub fn render_entries(state: &JournalState) -> Markup {
    html! {
        section id=(CONTAINER_ID) {
            @for entry in state.rendered() {
                (render_entry(entry))
            }
        }
    }
}

pub fn render_entry(entry: &JournalEntry) -> Markup {
    let is_new = entry.origin == Origin::Local;
    let is_json = entry.origin == Origin::Json;
    html! {
        article.journal-entry.collapsible
            data-entry-id=(entry.id.as_deref().unwrap_or(""))
            data-is-new=(if is_new { "true" } else { "false" })
            data-source=[is_json.then_some("json")]
        {
            div.collapsible-header {
                h2 { (entry.title) }
                div.header-spacer {}
                div.entry-actions {
                    span.toggle-icon aria-label="Toggle section" { "▼" }
                    @if is_new {
                        button.edit-btn type="button" { "✏️ Edit" }
                    }
                    button.copy-btn type="button" { "📋 Copy" }
                }
            }
            div.collapsible-content {
                div.entry-meta { (entry.meta_line()) }
                div.entry-content {
                    @for (i, line) in entry.content.split('\n').enumerate() {
                        @if i > 0 { br; }
                        (line)
                    }
                }
                @if is_json {
                    small { "💡 This entry was added using the Python script and stored in reflections.json" }
                }
                @if is_new {
                    div {
                        button.delete-btn type="button" { "🗑️ Delete Entry" }
                    }
                }
            }
        }
    }
}
