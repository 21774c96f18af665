//! HTML pages.
//!
//! Templates are compiled into the binary and use `{{ name }}` placeholders.
//! Values added with [`Context::text`] are escaped; [`Context::html`] is for
//! fragments the server built itself.

use anyhow::{Context as _, Result};
use axum::response::Html;
use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::debug;

use crate::notes::Note;

const LAYOUT: &str = include_str!("../../templates/layout.html");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Home,
    Login,
    Member,
    NoteCreate,
    NoteList,
    NoteDetail,
    Search,
    Unauthorized,
}

impl Page {
    const fn template(self) -> &'static str {
        match self {
            Self::Home => include_str!("../../templates/home.html"),
            Self::Login => include_str!("../../templates/login.html"),
            Self::Member => include_str!("../../templates/member.html"),
            Self::NoteCreate => include_str!("../../templates/note_create.html"),
            Self::NoteList => include_str!("../../templates/note_list.html"),
            Self::NoteDetail => include_str!("../../templates/note_detail.html"),
            Self::Search => include_str!("../../templates/search.html"),
            Self::Unauthorized => include_str!("../../templates/unauthorized.html"),
        }
    }

    const fn default_title(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Login => "Login",
            Self::Member => "Members only",
            Self::NoteCreate => "New note",
            Self::NoteList => "My notes",
            Self::NoteDetail => "Note",
            Self::Search => "Search",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

/// Values substituted into a page.
#[derive(Clone, Debug, Default)]
pub struct Context {
    values: HashMap<&'static str, String>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user-supplied value; it is escaped on insert.
    #[must_use]
    pub fn text(mut self, key: &'static str, value: &str) -> Self {
        self.values.insert(key, escape_html(value));
        self
    }

    /// Add markup produced by the server.
    #[must_use]
    pub fn html(mut self, key: &'static str, value: String) -> Self {
        self.values.insert(key, value);
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[derive(Debug)]
pub struct Renderer {
    placeholder: Regex,
}

impl Renderer {
    /// # Errors
    /// Returns an error if the placeholder pattern fails to compile.
    pub fn new() -> Result<Self> {
        let placeholder =
            Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").context("invalid placeholder pattern")?;
        Ok(Self { placeholder })
    }

    /// Render `page` inside the shared layout. A `title` in `context`
    /// overrides the page's default title.
    #[must_use]
    pub fn render(&self, page: Page, context: &Context) -> Html<String> {
        let body = self.fill(page.template(), context);
        let title = context
            .get("title")
            .map_or_else(|| page.default_title().to_string(), str::to_string);
        let layout = Context::new().html("title", title).html("body", body);
        Html(self.fill(LAYOUT, &layout))
    }

    fn fill(&self, template: &str, context: &Context) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures| {
                let key = &caps[1];
                context.get(key).map_or_else(
                    || {
                        debug!(key, "template placeholder has no value");
                        String::new()
                    },
                    str::to_string,
                )
            })
            .into_owned()
    }
}

/// List items linking each note to its page, or a single `empty` item.
#[must_use]
pub fn note_items(notes: &[Note], empty: &str) -> String {
    if notes.is_empty() {
        return format!("<li>{}</li>", escape_html(empty));
    }

    notes
        .iter()
        .map(|note| {
            format!(
                r#"<li><a href="/note/{}">{}</a></li>"#,
                note.id,
                escape_html(&note.title)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b class="x">Tom & 'Jerry'</b>"#),
            "&lt;b class=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn member_page_shows_escaped_username() -> Result<()> {
        let renderer = Renderer::new()?;
        let Html(page) = renderer.render(Page::Member, &Context::new().text("username", "<alice>"));
        assert!(page.contains("Welcome back, &lt;alice&gt;."));
        assert!(page.contains("<title>Members only - notekeep</title>"));
        assert!(!page.contains("{{"));
        Ok(())
    }

    #[test]
    fn title_overrides_default() -> Result<()> {
        let renderer = Renderer::new()?;
        let context = Context::new()
            .text("title", "Sign Up")
            .text("action", "/new");
        let Html(page) = renderer.render(Page::Login, &context);
        assert!(page.contains("<title>Sign Up - notekeep</title>"));
        assert!(page.contains(r#"action="/new""#));
        Ok(())
    }

    #[test]
    fn missing_values_render_empty() -> Result<()> {
        let renderer = Renderer::new()?;
        let Html(page) = renderer.render(Page::Search, &Context::new());
        assert!(page.contains(r#"value="""#));
        Ok(())
    }

    #[test]
    fn note_items_link_by_id() {
        let note = Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "a<b".to_string(),
            content: String::new(),
        };
        let html = note_items(std::slice::from_ref(&note), "none");
        assert_eq!(html, format!(r#"<li><a href="/note/{}">a&lt;b</a></li>"#, note.id));
        assert_eq!(note_items(&[], "No notes yet."), "<li>No notes yet.</li>");
    }
}
