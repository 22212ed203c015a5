//! Frame rendering. Reads the session, records hit areas for the mouse.

use chrono::{Datelike, NaiveDate};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, HitAreas, Level, first_day_of_month, last_day_of_month};
use crate::display::{DisplayLine, day_label};
use crate::forms::{Confirm, FormField, Modal, Prompt, TaskForm, TextInput};
use crate::markdown;
use crate::model::{Item, Priority};
use crate::search::SearchState;
use crate::views::{Overlay, Pane, Tab, View};

const SIDEBAR_WIDTH: u16 = 30;
const STATUS_HEIGHT: u16 = 4;

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::Rgb(44, 54, 84))
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn key_style() -> Style {
    Style::default().fg(Color::Cyan)
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Rows available inside a bordered pane.
fn inner_height(area: Rect) -> usize {
    usize::from(area.height.saturating_sub(2))
}

pub fn draw(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let mut hits = HitAreas {
        tabs: render_tabs(frame, root[0], app),
        ..HitAreas::default()
    };

    let body = root[1];
    let (sidebar, rest) = if app.nav().view().has_sidebar() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(body);
        (Some(cols[0]), cols[1])
    } else {
        (None, body)
    };
    let (main, panel) = if app.nav().panel_open() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rest);
        (cols[0], Some(cols[1]))
    } else {
        (rest, None)
    };

    app.set_list_heights(inner_height(main), sidebar.map_or(0, inner_height));
    hits.sidebar = sidebar;
    hits.main = Some(main);

    if let Some(area) = sidebar {
        render_sidebar(frame, area, app);
    }
    match app.nav().view() {
        View::LabelList => render_labels(frame, main, app),
        View::Sections => render_sections(frame, main, app),
        View::CalendarMonth => hits.days = render_calendar(frame, main, app),
        View::Today | View::Upcoming | View::LabelItems | View::CalendarDay | View::Projects => {
            render_items(frame, main, app);
        }
    }
    if let Some(area) = panel {
        let block = Block::default().title("Details").borders(Borders::ALL);
        render_detail(frame, area, block, app, app.cursor_item(), 0);
    }

    if let Some(overlay) = app.nav().overlay() {
        let area = centered(body, 80, 90);
        frame.render_widget(Clear, area);
        render_overlay(frame, area, app, overlay);
    }
    if let Some(modal) = app.modal() {
        render_modal(frame, centered(body, 60, 30), modal);
    }
    render_status(frame, root[2], app);

    app.hits = hits;
}

fn centered(area: Rect, width_pct: u16, height_pct: u16) -> Rect {
    let width = area.width.saturating_mul(width_pct) / 100;
    let height = (area.height.saturating_mul(height_pct) / 100).max(5).min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App) -> Vec<(Tab, Rect)> {
    let mut spans = vec![Span::styled(" tasklane ", Style::default().fg(Color::Black).bg(Color::Cyan))];
    let mut hits = Vec::new();
    let mut x = area.x + 10;
    for (n, tab) in Tab::ALL.into_iter().enumerate() {
        let label = format!(" {} {} ", n + 1, tab.title());
        let width = label.chars().count() as u16;
        let style = if tab == app.nav().tab() {
            highlight_style()
        } else {
            Style::default().fg(Color::Gray)
        };
        hits.push((
            tab,
            Rect {
                x,
                y: area.y,
                width,
                height: 1,
            },
        ));
        x = x.saturating_add(width + 1);
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
    hits
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .projects()
        .iter()
        .map(|project| {
            let count = app
                .items()
                .iter()
                .filter(|item| item.project_id == project.id)
                .count();
            let marker = if project.inbox {
                "⌂ "
            } else if project.favorite {
                "★ "
            } else {
                "  "
            };
            let indent = if project.parent_id.is_some() { "  " } else { "" };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{marker}{indent}{}", project.name)),
                Span::styled(format!(" {count}"), dim()),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    if !app.projects().is_empty() {
        state.select(Some(app.sidebar_cursor()));
        state = state.with_offset(app.sidebar_view().offset());
    }
    let focused = app.nav().pane() == Pane::Sidebar && !app.nav().overlay_open();
    let list = List::new(items)
        .block(
            Block::default()
                .title("Projects")
                .borders(Borders::ALL)
                .border_style(focus_style(focused)),
        )
        .highlight_style(highlight_style())
        .highlight_symbol(" > ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn list_title(app: &App) -> String {
    let nav = app.nav();
    match nav.view() {
        View::Today => String::from("Today"),
        View::Upcoming => String::from("Upcoming"),
        View::LabelItems => format!("@{}", nav.label().unwrap_or_default()),
        View::CalendarDay => day_label(nav.day(), app.today()),
        View::Projects => app
            .current_project()
            .map_or_else(|| String::from("No project"), |project| project.name.clone()),
        View::LabelList => String::from("Labels"),
        View::Sections => String::from("Sections"),
        View::CalendarMonth => nav.day().format("%B %Y").to_string(),
    }
}

fn render_items(frame: &mut Frame, area: Rect, app: &App) {
    let index = app.index();
    let today = app.today();
    let lines: Vec<ListItem> = index
        .lines()
        .iter()
        .map(|line| match line {
            DisplayLine::Item { index, depth } => match app.visible().get(*index) {
                Some(item) => ListItem::new(item_line(item, *depth, today, app)),
                None => ListItem::new(""),
            },
            DisplayLine::Header { label } => ListItem::new(Line::from(Span::styled(
                label.clone(),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ))),
            DisplayLine::Placeholder { section_name, .. } => ListItem::new(Line::from(vec![
                Span::styled(
                    section_name.clone(),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("  (empty, a to add)", dim().add_modifier(Modifier::ITALIC)),
            ])),
            DisplayLine::Blank => ListItem::new(""),
        })
        .collect();

    let mut state = ListState::default().with_offset(app.viewport().offset());
    if !index.is_empty() {
        state.select(index.line_of(app.cursor()));
    }

    let focused = app.nav().pane() == Pane::Main && !app.nav().overlay_open();
    let empty = lines.is_empty();
    let block = Block::default()
        .title(format!("{} ({})", list_title(app), app.visible().len()))
        .borders(Borders::ALL)
        .border_style(focus_style(focused));

    if empty {
        let text = if app.is_loaded() {
            "Nothing here. Press a to add a task."
        } else {
            "Loading..."
        };
        frame.render_widget(Paragraph::new(Span::styled(text, dim())).block(block), area);
        return;
    }

    let list = List::new(lines)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol(" > ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn priority_style(priority: Priority) -> Style {
    match priority.display_level() {
        1 => Style::default().fg(Color::Red),
        2 => Style::default().fg(Color::Yellow),
        3 => Style::default().fg(Color::Blue),
        _ => dim(),
    }
}

fn item_line(item: &Item, depth: usize, today: NaiveDate, app: &App) -> Line<'static> {
    let selected = app.selection().contains(&item.id);
    let mut spans = vec![
        Span::styled(
            if selected { "● " } else { "  " },
            Style::default().fg(Color::Green),
        ),
        Span::raw("  ".repeat(depth)),
        Span::styled(
            if item.checked { "[x] " } else { "[ ] " },
            priority_style(item.priority),
        ),
    ];
    let content_style = if item.checked {
        dim().add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    spans.push(Span::styled(item.content.clone(), content_style));

    if let Some(due) = &item.due {
        let style = if due.date < today {
            Style::default().fg(Color::Red)
        } else if due.date == today {
            Style::default().fg(Color::Green)
        } else {
            dim()
        };
        let mut text = day_label(due.date, today);
        if let Some(time) = due.time {
            text.push_str(&time.format(" %H:%M").to_string());
        }
        if due.recurring {
            text.push_str(" ↻");
        }
        spans.push(Span::styled(format!("  {text}"), style));
    }
    for label in &item.labels {
        spans.push(Span::styled(format!(" @{label}"), Style::default().fg(Color::Cyan)));
    }
    if item.comment_count > 0 {
        spans.push(Span::styled(format!(" ({} comments)", item.comment_count), dim()));
    }
    Line::from(spans)
}

fn render_group_list(frame: &mut Frame, area: Rect, app: &App, title: String, rows: Vec<Line<'static>>) {
    let mut state = ListState::default();
    let empty = rows.is_empty();
    if !empty {
        state.select(Some(app.group_cursor()));
        state = state.with_offset(app.group_view().offset());
    }
    let focused = !app.nav().overlay_open();
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    if empty {
        frame.render_widget(Paragraph::new(Span::styled("Nothing here", dim())).block(block), area);
        return;
    }
    let list = List::new(rows.into_iter().map(ListItem::new).collect::<Vec<_>>())
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol(" > ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_labels(frame: &mut Frame, area: Rect, app: &App) {
    let rows = app
        .labels()
        .iter()
        .map(|label| {
            Line::from(vec![
                Span::styled(format!("@{}", label.name), Style::default().fg(Color::Cyan)),
                Span::styled(format!(" {}", app.label_count(&label.name)), dim()),
            ])
        })
        .collect();
    render_group_list(frame, area, app, String::from("Labels"), rows);
}

fn render_sections(frame: &mut Frame, area: Rect, app: &App) {
    let rows = app
        .project_sections()
        .into_iter()
        .map(|section| {
            let count = app
                .items()
                .iter()
                .filter(|item| item.section_id.as_deref() == Some(section.id.as_str()))
                .count();
            Line::from(vec![
                Span::raw(section.name.clone()),
                Span::styled(format!(" {count}"), dim()),
            ])
        })
        .collect();
    let project = app
        .current_project()
        .map_or_else(String::new, |project| project.name.clone());
    render_group_list(
        frame,
        area,
        app,
        format!("Sections of {project} (a add, e rename, Del delete)"),
        rows,
    );
}

fn render_calendar(frame: &mut Frame, area: Rect, app: &App) -> Vec<(NaiveDate, Rect)> {
    let day = app.nav().day();
    let block = Block::default()
        .title(format!("{}  (< > month, Enter open day)", list_title(app)))
        .borders(Borders::ALL)
        .border_style(focus_style(!app.nav().overlay_open()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let first = first_day_of_month(day);
    let Some(last) = last_day_of_month(day) else {
        return Vec::new();
    };
    let lead = first.weekday().num_days_from_monday() as usize;
    let days = last.day() as usize;
    let rows = (lead + days).div_ceil(7).max(1);
    if inner.width < 7 || inner.height < 2 {
        return Vec::new();
    }
    let cell_w = inner.width / 7;
    let cell_h = ((inner.height - 1) / rows as u16).max(1);

    let header: Vec<Span> = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        .iter()
        .map(|name| Span::styled(format!("{name:<width$}", width = cell_w as usize), dim()))
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(header)),
        Rect { height: 1, ..inner },
    );

    let counts = app.day_counts(day);
    let mut hits = Vec::with_capacity(days);
    for n in 0..days {
        let Some(date) = first.checked_add_days(chrono::Days::new(n as u64)) else {
            continue;
        };
        let slot = lead + n;
        let (row, col) = ((slot / 7) as u16, (slot % 7) as u16);
        let y = inner.y + 1 + row * cell_h;
        if y >= inner.y + inner.height {
            break;
        }
        let rect = Rect {
            x: inner.x + col * cell_w,
            y,
            width: cell_w,
            height: cell_h.min(inner.y + inner.height - y),
        };

        let mut style = Style::default();
        if date == app.today() {
            style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
        }
        if date == day {
            style = highlight_style();
        }
        let count = counts.get(&date).copied().unwrap_or(0);
        let mut lines = vec![Line::from(Span::styled(format!("{:>2}", date.day()), style))];
        if count > 0 {
            lines.push(Line::from(Span::styled(
                format!("{count} task{}", if count == 1 { "" } else { "s" }),
                Style::default().fg(Color::Cyan),
            )));
        }
        frame.render_widget(Paragraph::new(lines).style(style), rect);
        hits.push((date, rect));
    }
    hits
}

fn render_detail(
    frame: &mut Frame,
    area: Rect,
    block: Block,
    app: &App,
    item: Option<&Item>,
    scroll: u16,
) {
    let Some(item) = item else {
        frame.render_widget(
            Paragraph::new(Span::styled("No task selected", dim())).block(block),
            area,
        );
        return;
    };

    let field = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{name:<10}"), key_style()),
            Span::raw(value),
        ])
    };
    let project = app
        .projects()
        .iter()
        .find(|project| project.id == item.project_id)
        .map_or_else(|| item.project_id.clone(), |project| project.name.clone());

    let mut lines = vec![
        Line::from(Span::styled(
            item.content.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        field("Project", project),
        field(
            "Due",
            item.due.as_ref().map_or_else(|| String::from("-"), |due| due.label()),
        ),
        field("Priority", item.priority.to_string()),
        field(
            "Labels",
            if item.labels.is_empty() {
                String::from("-")
            } else {
                item.labels.join(", ")
            },
        ),
        field("Status", String::from(if item.checked { "done" } else { "open" })),
    ];
    if !item.description.trim().is_empty() {
        lines.push(Line::default());
        lines.extend(markdown::render(&item.description));
    }

    let overlay_item = matches!(
        app.nav().overlay(),
        Some(Overlay::Detail { item_id }) if *item_id == item.id
    );
    if overlay_item {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("Comments ({})", app.comments().len()),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        for comment in app.comments() {
            let posted = comment.posted.get(..16).unwrap_or(comment.posted.as_str()).replace('T', " ");
            lines.push(Line::from(Span::styled(posted, dim())));
            lines.extend(markdown::render(&comment.text));
        }
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("e", key_style()),
            Span::raw(" edit  "),
            Span::styled("c", key_style()),
            Span::raw(" comment  "),
            Span::styled("x", key_style()),
            Span::raw(" complete  "),
            Span::styled("Esc", key_style()),
            Span::raw(" back"),
        ]));
    }

    let para = Paragraph::new(lines)
        .block(block)
        .scroll((scroll, 0))
        .wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

fn render_overlay(frame: &mut Frame, area: Rect, app: &App, overlay: &Overlay) {
    let block = Block::default()
        .title(overlay.title())
        .borders(Borders::ALL)
        .border_style(focus_style(app.modal().is_none()));
    match overlay {
        Overlay::Detail { item_id } => {
            let item = app.item(item_id);
            if item.is_none() {
                frame.render_widget(
                    Paragraph::new("This task is no longer loaded.").block(block),
                    area,
                );
                return;
            }
            render_detail(frame, area, block, app, item, app.overlay_scroll());
        }
        Overlay::Form(form) => render_form(frame, area, block, form),
        Overlay::Search(search) => render_search(frame, area, block, app, search),
        Overlay::Help => render_help(frame, area, block, app),
    }
}

/// Input text with a reversed cell marking the cursor.
fn input_spans(input: &TextInput, active: bool) -> Vec<Span<'static>> {
    if !active {
        return vec![Span::raw(input.value().to_string())];
    }
    let chars: Vec<char> = input.value().chars().collect();
    let at = input.cursor().min(chars.len());
    let before: String = chars[..at].iter().collect();
    let under: String = chars.get(at).map_or_else(|| String::from(" "), |ch| ch.to_string());
    let after: String = chars.get(at + 1..).map_or_else(String::new, |rest| rest.iter().collect());
    vec![
        Span::raw(before),
        Span::styled(under, Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(after),
    ]
}

fn render_form(frame: &mut Frame, area: Rect, block: Block, form: &TaskForm) {
    let mut lines = Vec::new();
    for field in FormField::ALL {
        let active = field == form.focus;
        let mut spans = vec![Span::styled(
            format!("{:<16}", field.title()),
            if active { Style::default().fg(Color::Yellow) } else { key_style() },
        )];
        spans.extend(input_spans(form.field(field), active));
        lines.push(Line::from(spans));
        lines.push(Line::default());
    }
    if form.section_id().is_some() {
        lines.push(Line::from(Span::styled("Adding into the selected section", dim())));
    }
    lines.push(Line::from(Span::styled(
        "Due: today, tomorrow, YYYY-MM-DD, YYYY-MM-DD HH:MM, none, or free text",
        dim(),
    )));
    if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled("Tab", key_style()),
        Span::raw(" next field  "),
        Span::styled("Enter", key_style()),
        Span::raw(" save  "),
        Span::styled("Esc", key_style()),
        Span::raw(" cancel"),
    ]));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_search(frame: &mut Frame, area: Rect, block: Block, app: &App, search: &SearchState) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let mut query = vec![Span::styled("> ", Style::default().fg(Color::Yellow))];
    query.extend(input_spans(&search.query, true));
    query.push(Span::styled(format!("  {} matches", search.results().len()), dim()));
    frame.render_widget(Paragraph::new(Line::from(query)), rows[0]);

    let today = app.today();
    let items: Vec<ListItem> = search
        .results()
        .iter()
        .filter_map(|id| app.item(id))
        .map(|item| ListItem::new(item_line(item, 0, today, app)))
        .collect();
    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(search.cursor()));
    }
    let list = List::new(items)
        .highlight_style(highlight_style())
        .highlight_symbol(" > ");
    frame.render_stateful_widget(list, rows[1], &mut state);
}

fn render_help(frame: &mut Frame, area: Rect, block: Block, app: &App) {
    let lines: Vec<Line> = app
        .keys()
        .describe()
        .into_iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{keys:<22}"), key_style()),
                Span::raw(action.replace('_', " ")),
            ])
        })
        .collect();
    let para = Paragraph::new(lines)
        .block(block)
        .scroll((app.overlay_scroll(), 0));
    frame.render_widget(para, area);
}

fn render_modal(frame: &mut Frame, area: Rect, modal: &Modal) {
    frame.render_widget(Clear, area);
    match modal {
        Modal::Prompt(prompt) => render_prompt(frame, area, prompt),
        Modal::Confirm(confirm) => render_confirm(frame, area, confirm),
    }
}

fn render_prompt(frame: &mut Frame, area: Rect, prompt: &Prompt) {
    let mut lines = vec![Line::from(input_spans(&prompt.input, true)), Line::default()];
    if let Some(err) = &prompt.error {
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(vec![
        Span::styled("Enter", key_style()),
        Span::raw(" submit  "),
        Span::styled("Esc", key_style()),
        Span::raw(" cancel"),
    ]));
    let block = Block::default()
        .title(prompt.kind.title())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_confirm(frame: &mut Frame, area: Rect, confirm: &Confirm) {
    let lines = vec![
        Line::from(confirm.question()),
        Line::default(),
        Line::from(vec![
            Span::styled("[y]es", Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::styled("[n]o", Style::default().fg(Color::Red)),
        ]),
    ];
    let block = Block::default()
        .title("Confirm")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let status = app.status();
    let status_style = match status.level {
        Level::Info => Style::default(),
        Level::Warn => Style::default().fg(Color::Yellow),
        Level::Error => Style::default().fg(Color::Red),
    };
    let mut first = Vec::new();
    if app.is_busy() {
        first.push(Span::styled(format!("{} ", app.spinner()), Style::default().fg(Color::Yellow)));
    }
    first.push(Span::styled(status.text.clone(), status_style));
    if !app.selection().is_empty() {
        first.push(Span::styled(
            format!("  [{} selected]", app.selection().len()),
            Style::default().fg(Color::Green),
        ));
    }
    if let Some(pending) = app.keys().pending() {
        first.push(Span::styled(format!("  {pending}-"), Style::default().fg(Color::Yellow)));
    }

    let hints = Line::from(vec![
        Span::styled("1-5", key_style()),
        Span::raw(" tabs  "),
        Span::styled("j/k", key_style()),
        Span::raw(" move  "),
        Span::styled("Enter", key_style()),
        Span::raw(" open  "),
        Span::styled("a", Style::default().fg(Color::Green)),
        Span::raw(" add  "),
        Span::styled("x", Style::default().fg(Color::Green)),
        Span::raw(" done  "),
        Span::styled("space", key_style()),
        Span::raw(" select  "),
        Span::styled("/", key_style()),
        Span::raw(" search  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" refresh  "),
        Span::styled("?", key_style()),
        Span::raw(" help  "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" quit"),
    ]);

    let para = Paragraph::new(vec![Line::from(first), hints])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
    frame.render_widget(para, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{Project, Section, Snapshot};
    use crate::runtime::Msg;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        let mut out = String::new();
        for row in buffer.content.chunks(width) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    fn loaded_app(tab: Tab) -> App {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).expect("date");
        let mut app = App::new(&Config::default(), tab, today).expect("app");
        app.take_effects();
        app.handle_msg(Msg::Snapshot(Ok(Snapshot {
            items: vec![Item {
                id: "1".into(),
                content: "Water the plants".into(),
                project_id: "p".into(),
                ..Item::default()
            }],
            projects: vec![Project {
                id: "p".into(),
                name: "Home".into(),
                inbox: true,
                ..Project::default()
            }],
            sections: vec![Section {
                id: "s".into(),
                name: "Garden".into(),
                project_id: "p".into(),
                order: 1,
            }],
            labels: Vec::new(),
        })));
        app
    }

    #[test]
    fn today_view_renders_buckets_and_status() {
        let mut app = loaded_app(Tab::Today);
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");
        let text = screen(&terminal);
        assert!(text.contains("No date"));
        assert!(text.contains("Water the plants"));
        assert!(text.contains("Synced 1 tasks in 1 projects"));
        assert_eq!(app.hits.tabs.len(), Tab::ALL.len());
    }

    #[test]
    fn project_view_shows_sidebar_and_placeholder() {
        let mut app = loaded_app(Tab::Projects);
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");
        let text = screen(&terminal);
        assert!(text.contains("Home"));
        assert!(text.contains("Garden"));
        assert!(text.contains("(empty, a to add)"));
        assert!(app.hits.sidebar.is_some());
    }

    #[test]
    fn calendar_records_day_cells() {
        let mut app = loaded_app(Tab::Calendar);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");
        assert_eq!(app.hits.days.len(), 31);
        assert!(screen(&terminal).contains("January 2024"));
    }
}
