//! Read command - interactive reader session on stdin/stdout

use std::{collections::HashMap, io::Write, path::Path};

use color_eyre::eyre::{Result, WrapErr};
use folio_core::parse_page;
use folio_search::{CommentaryExtractor, IndexState, ResultList, Surface};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::BookContext;
use crate::{
    prefs::Preferences,
    session::{ReaderSession, TextPane, ViewMode},
};

const HELP: &[&str] = &[
    "n, next            next page",
    "p, prev            previous page",
    "g, goto <page>     go to page",
    "v, view            toggle image/text view",
    "z, zoom <percent>  set zoom",
    "t, theme           toggle theme",
    "/ <query>          inline search",
    "o, overlay [query] open the search overlay",
    "j / k              move the active result down / up",
    "s, select [n]      open the active (or n-th) result",
    "x, close           close the focused search surface",
    "text               show the current page text",
    "status             show session state",
    "h, help            this help",
    "q, quit            exit",
];

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Goto(String),
    ToggleView,
    Zoom(String),
    ToggleTheme,
    Search(String),
    Overlay(Option<String>),
    Down,
    Up,
    Select(Option<usize>),
    Close,
    Text,
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if let Some(query) = line.strip_prefix('/') {
        return Command::Search(query.trim().to_string());
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "" => Command::Empty,
        "n" | "next" => Command::Next,
        "p" | "prev" => Command::Prev,
        "g" | "goto" => Command::Goto(rest.to_string()),
        "v" | "view" => Command::ToggleView,
        "z" | "zoom" => Command::Zoom(rest.to_string()),
        "t" | "theme" => Command::ToggleTheme,
        "o" | "overlay" if rest.is_empty() => Command::Overlay(None),
        "o" | "overlay" => Command::Overlay(Some(rest.to_string())),
        "j" => Command::Down,
        "k" => Command::Up,
        "s" | "select" => Command::Select(rest.parse().ok()),
        "x" | "close" => Command::Close,
        "text" => Command::Text,
        "status" => Command::Status,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Reader state driven by commands; output is collected as lines.
pub struct Repl {
    session: ReaderSession,
    lists: HashMap<Surface, ResultList>,
    focus: Option<Surface>,
    extractor: CommentaryExtractor,
}

impl Repl {
    /// Wrap a restored session.
    pub fn new(session: ReaderSession, extractor: CommentaryExtractor) -> Self {
        Self {
            session,
            lists: HashMap::new(),
            focus: None,
            extractor,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &ReaderSession {
        &self.session
    }

    /// Apply a command. Returns `false` when the session should end.
    pub async fn handle(&mut self, command: Command, out: &mut Vec<String>) -> bool {
        match command {
            Command::Next => {
                self.session.next_page().await;
                self.page_lines(out);
            }
            Command::Prev => {
                self.session.prev_page().await;
                self.page_lines(out);
            }
            Command::Goto(input) => {
                self.session.go_to_page(parse_page(&input)).await;
                self.page_lines(out);
            }
            Command::ToggleView => {
                self.session.toggle_view().await;
                self.page_lines(out);
            }
            Command::Zoom(input) => match input.trim().parse::<u16>() {
                Ok(level) => match self.session.set_zoom(level) {
                    Ok(zoom) => out.push(format!("Zoom {zoom}%")),
                    Err(e) => out.push(format!("⚠ {e}")),
                },
                Err(_) => out.push(format!("⚠ not a zoom level: {input}")),
            },
            Command::ToggleTheme => {
                let theme = self.session.toggle_theme();
                out.push(format!("Theme {theme}"));
            }
            Command::Search(query) => self.search(Surface::Inline, &query, out),
            Command::Overlay(query) => {
                self.session.open_surface(Surface::Overlay);
                self.lists.remove(&Surface::Overlay);
                self.focus = Some(Surface::Overlay);
                match query {
                    Some(query) => self.search(Surface::Overlay, &query, out),
                    None => out.push("Overlay open, type / <query>".to_string()),
                }
            }
            Command::Down => self.move_active(true, out),
            Command::Up => self.move_active(false, out),
            Command::Select(row) => self.select(row, out).await,
            Command::Close => {
                if let Some(surface) = self.focus.take() {
                    self.session.close_surface(surface);
                    self.lists.remove(&surface);
                    out.push(format!("Closed {surface} search"));
                }
            }
            Command::Text => self.text_lines(out),
            Command::Status => self.status_lines(out),
            Command::Help => out.extend(HELP.iter().map(|line| format!("  {line}"))),
            Command::Quit => return false,
            Command::Empty => {}
            Command::Unknown(line) => out.push(format!("⚠ unknown command: {line} (h for help)")),
        }

        true
    }

    fn search(&mut self, surface: Surface, query: &str, out: &mut Vec<String>) {
        // Overlay queries typed with `/` stay in the overlay while it is focused.
        let surface = match (surface, self.focus) {
            (Surface::Inline, Some(Surface::Overlay)) => Surface::Overlay,
            _ => surface,
        };

        let list = self.session.search(surface, query);
        self.focus = Some(surface);
        list_lines(surface, &list, out);
        self.lists.insert(surface, list);
    }

    fn move_active(&mut self, down: bool, out: &mut Vec<String>) {
        let Some(surface) = self.focus else {
            out.push("⚠ no open search".to_string());
            return;
        };
        if let Some(list) = self.lists.get_mut(&surface) {
            if down {
                list.move_down();
            } else {
                list.move_up();
            }
            list_lines(surface, list, out);
        }
    }

    async fn select(&mut self, row: Option<usize>, out: &mut Vec<String>) {
        let Some(surface) = self.focus else {
            out.push("⚠ no open search".to_string());
            return;
        };
        let Some(list) = self.lists.get(&surface) else {
            out.push("⚠ no results".to_string());
            return;
        };

        let mut chosen = None;
        let selected = match row {
            Some(n) => list.select(n.saturating_sub(1), |r| chosen = Some(r.clone())),
            None => list.select_active(|r| chosen = Some(r.clone())),
        };

        match chosen {
            Some(result) if selected => {
                self.session.select_result(surface, &result).await;
                self.lists.remove(&surface);
                self.focus = None;
                self.page_lines(out);
            }
            _ => out.push("⚠ nothing to select".to_string()),
        }
    }

    /// Re-render open searches once the commentary index is ready.
    pub fn on_index_ready(&mut self, out: &mut Vec<String>) {
        out.push(format!(
            "Commentary index ready ({} entries)",
            self.session.engine().index().len()
        ));

        for (surface, list) in self.session.refresh_active() {
            if self.focus == Some(surface) {
                list_lines(surface, &list, out);
            }
            self.lists.insert(surface, list);
        }
    }

    fn page_lines(&self, out: &mut Vec<String>) {
        let location = self.session.location();
        out.push(format!(
            "{} ({:.0}%)",
            self.session.page_label(),
            self.session.progress_percent()
        ));
        match self.session.view() {
            ViewMode::Image => out.push(format!("  Image: {}", location.image_path)),
            ViewMode::Text => {
                out.push(format!("  Text:  {}", location.text_path));
                if let Some(message) = self.session.text().message() {
                    out.push(format!("  {message}"));
                }
            }
        }
    }

    fn text_lines(&self, out: &mut Vec<String>) {
        match self.session.text() {
            TextPane::Loaded(html) => {
                out.push(self.extractor.plain_text(html));
            }
            TextPane::Hidden => out.push(format!("  {}", self.session.view().toggle_label())),
            pane => out.extend(pane.message().map(|m| format!("  {m}"))),
        }
    }

    fn status_lines(&self, out: &mut Vec<String>) {
        let session = &self.session;
        out.push(session.page_label());
        out.push(format!("  View:   {}", session.view()));
        out.push(format!("  Zoom:   {}%", session.zoom()));
        out.push(format!("  Theme:  {}", session.theme()));
        out.push(format!(
            "  Index:  {:?}",
            session.engine().index().state()
        ));
        if let Some(surface) = self.focus {
            out.push(format!("  Search: {surface}"));
        }
    }
}

fn list_lines(surface: Surface, list: &ResultList, out: &mut Vec<String>) {
    out.push(format!("{surface} results:"));
    if list.is_empty() && !list.is_building() {
        out.push("  No results".to_string());
    }
    out.extend(list.to_lines().into_iter().map(|line| format!("  {line}")));
}

/// Run the read command.
pub async fn run(config_path: &Path, page: Option<&str>) -> Result<()> {
    tracing::info!(?config_path, ?page, "Starting reader");

    let ctx = BookContext::load(config_path)?;
    let prefs = Preferences::open_file(&ctx.config.prefs_path(), &ctx.config.reader.prefs_prefix);
    let extractor = CommentaryExtractor::new(&ctx.config.book.commentary_marker)
        .wrap_err("Invalid commentary marker")?;

    let mut session = ReaderSession::new(&ctx.config, ctx.engine, ctx.source, prefs);
    session.restore(page.map(parse_page)).await;

    println!("{}", ctx.config.book.title);
    let mut repl = Repl::new(session, extractor);
    let mut out = Vec::new();
    repl.handle(Command::Status, &mut out).await;
    flush(&mut out);

    let mut events = repl.session().index_events();
    let mut watching = *events.borrow_and_update() != IndexState::Ready;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.wrap_err("Failed to read input")? else {
                    break;
                };
                let keep_going = repl.handle(parse_command(&line), &mut out).await;
                flush(&mut out);
                if !keep_going {
                    break;
                }
            }
            changed = events.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                if *events.borrow_and_update() == IndexState::Ready {
                    watching = false;
                    println!();
                    repl.on_index_ready(&mut out);
                    flush(&mut out);
                }
            }
        }
    }

    tracing::info!(page = repl.session().page(), "Reader closed");
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn flush(out: &mut Vec<String>) {
    for line in out.drain(..) {
        println!("{line}");
    }
}
