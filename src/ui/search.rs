use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, InputMode};
use crate::types::{AccountKind, UserSummary};

use super::truncate;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_input(frame, app, chunks[0]);
    render_results(frame, app, chunks[1]);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(" Search GitHub users "),
    );
    frame.render_widget(input, area);

    if editing {
        let width = app.input.chars().count() as u16;
        let x = (area.x + 1 + width).min(area.right().saturating_sub(2));
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn render_results(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.search.state();

    if state.items.is_empty() {
        let (title, detail, color) = if state.is_loading() {
            ("Searching users...", String::new(), Color::Yellow)
        } else if let Some(err) = &state.error {
            ("Something went wrong", err.clone(), Color::Red)
        } else if state.submitted_query().is_some() {
            (
                "No users found",
                "Try searching for a different username.".to_string(),
                Color::Gray,
            )
        } else {
            (
                "Search for GitHub Users",
                "Press / to type a username, then Enter to search".to_string(),
                Color::Gray,
            )
        };
        render_placeholder(frame, area, title, &detail, color);
        return;
    }

    let title = match state.total_count {
        Some(total) => format!(" Found {} of {} user(s) ", state.items.len(), total),
        None => format!(" Found {} user(s) ", state.items.len()),
    };

    let w = area.width.saturating_sub(2) as usize;
    let fixed = 38; // login(30) + space(1) + kind(4) + spaces(3)
    let flex = w.saturating_sub(fixed).max(10);
    let selected = app.user_index.min(state.items.len() - 1);

    let mut items: Vec<ListItem> = state
        .items
        .iter()
        .enumerate()
        .map(|(i, user)| user_line(user, i == selected, flex))
        .collect();

    if state.is_loading_more() {
        items.push(footer("Loading more users...", Color::Yellow));
    } else if state.end_reached {
        items.push(footer("No more users", Color::Red));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    list_state.select(Some(selected));

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn user_line(user: &UserSummary, is_selected: bool, flex: usize) -> ListItem<'static> {
    let style = if is_selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let kind_color = match user.kind {
        AccountKind::Organization => Color::Magenta,
        AccountKind::Bot => Color::Blue,
        _ => Color::Cyan,
    };

    let mut spans = vec![
        Span::styled(format!("{:<30}", truncate(&user.login, 30)), style),
        Span::raw(" "),
        Span::styled(
            format!("{:<4}", user.kind.to_string()),
            Style::default().fg(kind_color),
        ),
        Span::raw("   "),
        Span::styled(
            truncate(&user.html_url, flex),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if user.site_admin {
        spans.push(Span::styled(" staff", Style::default().fg(Color::Green)));
    }

    ListItem::new(Line::from(spans))
}

fn footer(text: &'static str, color: Color) -> ListItem<'static> {
    ListItem::new(Line::from(Span::styled(
        text,
        Style::default().fg(color).add_modifier(Modifier::ITALIC),
    )))
}

fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, detail: &str, color: Color) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            detail.to_string(),
            Style::default().fg(Color::Gray),
        )),
    ];

    let placeholder = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(placeholder, area);
}
