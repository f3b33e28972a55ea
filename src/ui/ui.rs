use image::DynamicImage;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use ratatui_image::{Resize, StatefulImage, picker::Picker, protocol::StatefulProtocol};
use std::collections::HashMap;

use crate::backend::controller::{AlbumController, FetchState};
use crate::backend::placeholder::ImageFetchError;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Loading,
    Ready,
    Failed,
}

pub struct App {
    pub state: AppState,
    pub loading_message: String,
    pub error_message: String,
    pub status_message: Option<String>,
    pub controller: AlbumController,
    pub cursor: usize,
    pub picker: Option<Picker>,
    pub image_states: HashMap<u32, StatefulProtocol>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        let picker = Picker::from_query_stdio().ok();

        Self {
            state: AppState::Loading,
            loading_message: "Initializing...".to_string(),
            error_message: String::new(),
            status_message: None,
            controller: AlbumController::new(),
            cursor: 0,
            picker,
            image_states: HashMap::new(),
        }
    }

    pub fn set_loading(&mut self, message: &str) {
        self.state = AppState::Loading;
        self.loading_message = message.to_string();
    }

    pub fn set_ready(&mut self) {
        self.state = AppState::Ready;
    }

    pub fn set_failed(&mut self, message: String) {
        self.state = AppState::Failed;
        self.error_message = message;
    }

    pub fn entry_id_at_cursor(&self) -> Option<u32> {
        self.controller.entries().get(self.cursor).map(|e| e.id)
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        let last = self.controller.entries().len().saturating_sub(1);
        if self.cursor < last {
            self.cursor += 1;
        }
    }

    /// Feeds a finished image fetch into the controller and, when the image
    /// actually attached, builds its terminal render protocol.
    pub fn on_image_result(
        &mut self,
        entry_id: u32,
        generation: u64,
        result: Result<DynamicImage, ImageFetchError>,
    ) {
        let live = matches!(
            self.controller.fetch_state(),
            FetchState::Loading { entry_id: e, generation: g } if e == entry_id && g == generation
        );
        let failed = result.is_err();
        self.controller.complete_fetch(generation, result);

        if !live {
            return;
        }

        if failed {
            self.status_message = Some(format!(
                "Loading image for entry {} failed, select it again to retry",
                entry_id
            ));
            return;
        }

        self.status_message = None;
        if let Some(entry) = self.controller.entry(entry_id) {
            if let (Some(picker), Some(image)) = (&self.picker, &entry.image) {
                let protocol = picker.new_resize_protocol(image.clone());
                self.image_states.insert(entry_id, protocol);
            }
        }
    }

    /// Deletes the selected entry and its render state, keeping the cursor
    /// inside the shrunken list.
    pub fn delete_selected(&mut self) -> Option<u32> {
        let id = self.controller.delete_selected()?;
        self.image_states.remove(&id);
        let last = self.controller.entries().len().saturating_sub(1);
        if self.cursor > last {
            self.cursor = last;
        }
        Some(id)
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    match app.state {
        AppState::Loading => draw_loading_screen(f, app),
        AppState::Failed => draw_failed_screen(f, app),
        AppState::Ready => draw_main_ui(f, app),
    }
}

fn draw_loading_screen(f: &mut Frame, app: &App) {
    let area = f.area();

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Album Photos")
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let center_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Percentage(40),
        ])
        .split(inner);

    let spinner_frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let frame_idx = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis()
        / 100) as usize
        % spinner_frames.len();

    let spinner = spinner_frames[frame_idx];

    let loading_text = Line::from(vec![
        Span::styled(
            format!(" {} ", spinner),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "Loading...",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    let loading_paragraph = Paragraph::new(loading_text).alignment(Alignment::Center);
    f.render_widget(loading_paragraph, center_layout[1]);

    let message = Paragraph::new(&*app.loading_message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(message, center_layout[2]);
}

fn draw_failed_screen(f: &mut Frame, app: &App) {
    let area = f.area();

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Album Photos")
        .border_style(Style::default().fg(Color::Red));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let center_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Percentage(40),
        ])
        .split(inner);

    let headline = Paragraph::new("Failed to load the album")
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(headline, center_layout[1]);

    let detail = Paragraph::new(&*app.error_message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(detail, center_layout[2]);
}

fn draw_main_ui(f: &mut Frame, app: &mut App) {
    let area = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(10),   // content
            Constraint::Length(3), // footer
        ])
        .split(area);

    draw_header(f, root[0]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45), // entry list
            Constraint::Percentage(55), // photo pane
        ])
        .split(root[1]);

    draw_entry_list(f, content_layout[0], app);
    draw_photo_pane(f, content_layout[1], app);

    draw_footer(f, root[2], app.status_message.as_deref());
}

fn draw_header(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "Album Photos",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  jsonplaceholder album 1",
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(title, area);
}

fn draw_entry_list(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Photos")
        .border_style(Style::default().fg(Color::White));

    let inner_width = block.inner(area).width as usize;

    if app.controller.entries().is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        let empty = Paragraph::new("No photos left")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, inner);
        return;
    }

    let selected_id = app.controller.selected_id();
    let items: Vec<ListItem> = app
        .controller
        .entries()
        .iter()
        .map(|entry| {
            let is_selected = selected_id == Some(entry.id);
            let title_style = if is_selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let mut spans = vec![
                Span::styled(if is_selected { "● " } else { "  " }, title_style),
                Span::styled(
                    truncate_text(&entry.title, inner_width.saturating_sub(16)),
                    title_style,
                ),
                Span::styled(
                    format!("  ID: {}", entry.id),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if app.controller.is_loading(entry.id) {
                spans.push(Span::styled(
                    "  loading...",
                    Style::default().fg(Color::Cyan),
                ));
            } else if entry.image_loaded() {
                spans.push(Span::styled("  ✓", Style::default().fg(Color::Green)));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol("▶ ")
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    list_state.select(Some(app.cursor));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_photo_pane(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Photo")
        .border_style(Style::default().fg(Color::White));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let selected_id = match app.controller.selected_id() {
        Some(id) => id,
        None => {
            let hint = Paragraph::new("Select a photo with Enter")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(hint, inner);
            return;
        }
    };

    if let Some(state) = app.image_states.get_mut(&selected_id) {
        let image_widget = StatefulImage::new().resize(Resize::Scale(None));
        f.render_stateful_widget(image_widget, inner, state);
        return;
    }

    // Placeholder while the fetch runs, or after a failed one.
    let placeholder = if app.controller.is_loading(selected_id) {
        vec![
            Line::from(""),
            Line::from(Span::styled("🖼", Style::default().fg(Color::Magenta))),
            Line::from(Span::styled(
                "Loading...",
                Style::default().fg(Color::DarkGray),
            )),
        ]
    } else {
        vec![
            Line::from(""),
            Line::from(Span::styled(
                "No image",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "Press Enter to retry",
                Style::default().fg(Color::DarkGray),
            )),
        ]
    };
    let paragraph = Paragraph::new(placeholder).alignment(Alignment::Center);
    f.render_widget(paragraph, inner);
}

fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        format!(
            "{}...",
            text.chars()
                .take(max_len.saturating_sub(3))
                .collect::<String>()
        )
    }
}

fn draw_footer(f: &mut Frame, area: Rect, status: Option<&str>) {
    let text = match status {
        Some(message) => Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(vec![
            Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
            Span::raw(": move  "),
            Span::styled("Enter", Style::default().fg(Color::Yellow)),
            Span::raw(": select  "),
            Span::styled("d", Style::default().fg(Color::Yellow)),
            Span::raw(": delete selected  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(": quit"),
        ]),
    };

    let p = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Center);
    f.render_widget(p, area);
}
