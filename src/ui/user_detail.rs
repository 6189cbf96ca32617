use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, UserDetail};
use crate::types::{Repository, UserProfile};

use super::{format_age, truncate};

const PROFILE_HEIGHT: u16 = 9;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(detail) = &app.detail else {
        let empty = Paragraph::new("No user selected")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(PROFILE_HEIGHT), Constraint::Min(0)])
        .split(area);

    render_profile(frame, detail, chunks[0]);
    render_repos(frame, detail, chunks[1]);
}

fn render_profile(frame: &mut Frame, detail: &UserDetail, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" @{} ", detail.login));

    let lines = match (&detail.profile, &detail.error) {
        (Some(profile), _) => profile_lines(profile),
        (None, Some(err)) => vec![
            Line::from(Span::styled(
                "Oops! Something went wrong",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(err.clone(), Style::default().fg(Color::Gray))),
        ],
        (None, None) => vec![Line::from(Span::styled(
            "Loading profile...",
            Style::default().fg(Color::Yellow),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn profile_lines(profile: &UserProfile) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let mut title = vec![
        Span::styled(
            profile.display_name().to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  @{}", profile.login)),
        Span::styled(
            format!("  [{}]", profile.kind),
            Style::default().fg(Color::Magenta),
        ),
    ];
    if profile.hireable == Some(true) {
        title.push(Span::styled(
            "  available for hire",
            Style::default().fg(Color::Green),
        ));
    }
    lines.push(Line::from(title));

    if let Some(bio) = profile.bio.as_deref().filter(|b| !b.trim().is_empty()) {
        lines.push(Line::from(Span::styled(
            bio.trim().to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }

    let details: Vec<String> = [
        profile.company.as_deref().map(|c| format!("Company: {}", c)),
        profile.location.as_deref().map(|l| format!("Location: {}", l)),
        profile.blog.as_deref().map(|b| format!("Web: {}", b)),
        profile.email.as_deref().map(|e| format!("Email: {}", e)),
        profile
            .twitter_username
            .as_deref()
            .map(|t| format!("Twitter: @{}", t)),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !details.is_empty() {
        lines.push(Line::from(Span::styled(
            details.join("  |  "),
            Style::default().fg(Color::Gray),
        )));
    }

    let stats = profile.stats;
    let stat = |n: u32, label: &str| {
        vec![
            Span::styled(
                n.to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {}   ", label)),
        ]
    };
    let mut counts = Vec::new();
    counts.extend(stat(stats.followers, "followers"));
    counts.extend(stat(stats.following, "following"));
    counts.extend(stat(stats.public_repos, "repos"));
    counts.extend(stat(stats.public_gists, "gists"));
    lines.push(Line::from(counts));

    if let Some(created) = profile.created_at {
        lines.push(Line::from(Span::styled(
            format!("Joined {}", created.format("%b %d, %Y")),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

fn render_repos(frame: &mut Frame, detail: &UserDetail, area: Rect) {
    let state = detail.repos.state();

    if state.items.is_empty() {
        let (text, color) = if state.is_loading() {
            ("Loading repositories...".to_string(), Color::Yellow)
        } else if let Some(err) = &state.error {
            (format!("Could not load repositories: {}", err), Color::Red)
        } else {
            ("No public repositories".to_string(), Color::Gray)
        };
        let placeholder = Paragraph::new(Span::styled(text, Style::default().fg(color)))
            .block(Block::default().borders(Borders::ALL).title(" Repositories "))
            .wrap(Wrap { trim: true });
        frame.render_widget(placeholder, area);
        return;
    }

    let w = area.width.saturating_sub(2) as usize;
    let selected = detail.repo_index.min(state.items.len() - 1);

    let mut items: Vec<ListItem> = state
        .items
        .iter()
        .enumerate()
        .map(|(i, repo)| repo_item(repo, i == selected, w))
        .collect();

    let footer = if state.is_loading_more() {
        Some(("Loading more repositories...", Color::Yellow))
    } else if state.end_reached {
        Some(("No more repositories", Color::Red))
    } else if state.can_load_more() {
        Some(("m: show more", Color::DarkGray))
    } else {
        None
    };
    if let Some((text, color)) = footer {
        items.push(ListItem::new(Line::from(Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::ITALIC),
        ))));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Repositories ({}) ", state.items.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    list_state.select(Some(selected));

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn repo_item(repo: &Repository, is_selected: bool, width: usize) -> ListItem<'static> {
    let name_style = if is_selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let mut head = vec![
        Span::styled(truncate(&repo.name, 40), name_style),
        Span::styled(
            format!("  ★{}  ⑂{}", repo.stars, repo.forks),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if let Some(lang) = &repo.language {
        head.push(Span::styled(
            format!("  {}", lang),
            Style::default().fg(Color::Green),
        ));
    }
    if repo.fork {
        head.push(Span::styled(" [fork]", Style::default().fg(Color::Blue)));
    }
    if repo.archived {
        head.push(Span::styled(" [archived]", Style::default().fg(Color::Red)));
    }
    if let Some(updated) = repo.updated_at {
        head.push(Span::styled(
            format!("  {}", format_age(updated)),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let description = repo
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("No description");

    ListItem::new(vec![
        Line::from(head),
        Line::from(Span::styled(
            format!("  {}", truncate(description, width.saturating_sub(2))),
            Style::default().fg(Color::Gray),
        )),
    ])
}
