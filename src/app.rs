//! Session state: caches, navigation, cursor, selection and the rules tying them together.
//!
//! Everything here is synchronous. Remote work leaves as [`Effect`]s and comes
//! back as [`Msg`]s through [`App::handle_msg`].

mod input;
mod messages;

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Days, Months, NaiveDate};
use ratatui::layout::Rect;

use crate::bulk::BulkOp;
use crate::config::Config;
use crate::display::{CursorTarget, DisplayIndex, Grouping};
use crate::error::ConfigError;
use crate::forms::{Confirm, Modal, Prompt, PromptKind, Submission, TaskForm};
use crate::keymap::{Action, KeyMachine};
use crate::model::{Comment, Due, Item, ItemPatch, Label, Priority, Project, Section};
use crate::runtime::{Effect, Request};
use crate::search::SearchState;
use crate::viewport::Viewport;
use crate::views::{Back, Navigator, Overlay, Pane, Tab, View};

pub const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const OVERLAY_PAGE: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub level: Level,
}

/// The one reversible action the session remembers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
    pub item_id: String,
    /// Content at the time of the action; the item may be gone after a reload.
    pub content: String,
    /// `true` when the recorded action closed the item.
    pub completed: bool,
}

/// Screen areas from the last frame, used to map mouse positions.
#[derive(Debug, Clone, Default)]
pub struct HitAreas {
    pub tabs: Vec<(Tab, Rect)>,
    pub sidebar: Option<Rect>,
    pub main: Option<Rect>,
    pub days: Vec<(NaiveDate, Rect)>,
}

pub struct App {
    nav: Navigator,
    keys: KeyMachine,
    modal: Option<Modal>,
    today: NaiveDate,
    upcoming_days: u32,

    items: Vec<Item>,
    projects: Vec<Project>,
    sections: Vec<Section>,
    labels: Vec<Label>,
    comments: Vec<Comment>,
    comments_for: Option<String>,

    visible: Vec<Item>,
    index: DisplayIndex,
    viewport: Viewport,
    cursor: usize,
    sidebar_cursor: usize,
    sidebar_view: Viewport,
    group_cursor: usize,
    group_view: Viewport,
    overlay_scroll: u16,
    selection: HashSet<String>,
    undo: Option<UndoRecord>,
    undoing: Option<UndoRecord>,

    loaded: bool,
    announce_sync: bool,
    pending: usize,
    spinner: usize,
    status: Status,
    effects: Vec<Effect>,
    quit: bool,
    pub(crate) hits: HitAreas,
}

impl App {
    /// Builds the session and queues the first full fetch.
    pub fn new(config: &Config, tab: Tab, today: NaiveDate) -> Result<Self, ConfigError> {
        let mut app = Self {
            nav: Navigator::new(tab, today),
            keys: config.keymap()?,
            modal: None,
            today,
            upcoming_days: config.upcoming_days,
            items: Vec::new(),
            projects: Vec::new(),
            sections: Vec::new(),
            labels: Vec::new(),
            comments: Vec::new(),
            comments_for: None,
            visible: Vec::new(),
            index: DisplayIndex::default(),
            viewport: Viewport::new(20),
            cursor: 0,
            sidebar_cursor: 0,
            sidebar_view: Viewport::new(20),
            group_cursor: 0,
            group_view: Viewport::new(20),
            overlay_scroll: 0,
            selection: HashSet::new(),
            undo: None,
            undoing: None,
            loaded: false,
            announce_sync: true,
            pending: 0,
            spinner: 0,
            status: Status {
                text: String::from("Loading..."),
                level: Level::Info,
            },
            effects: Vec::new(),
            quit: false,
            hits: HitAreas::default(),
        };
        app.request(Request::Snapshot);
        Ok(app)
    }

    pub fn nav(&self) -> &Navigator {
        &self.nav
    }

    pub fn keys(&self) -> &KeyMachine {
        &self.keys
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn visible(&self) -> &[Item] {
        &self.visible
    }

    pub fn index(&self) -> &DisplayIndex {
        &self.index
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn sidebar_cursor(&self) -> usize {
        self.sidebar_cursor
    }

    pub fn sidebar_view(&self) -> &Viewport {
        &self.sidebar_view
    }

    pub fn group_cursor(&self) -> usize {
        self.group_cursor
    }

    pub fn group_view(&self) -> &Viewport {
        &self.group_view
    }

    pub fn overlay_scroll(&self) -> u16 {
        self.overlay_scroll
    }

    pub fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    pub fn undo_record(&self) -> Option<&UndoRecord> {
        self.undo.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner % SPINNER.len()]
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Drains the effects queued since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn tick(&mut self) {
        if self.pending > 0 {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    /// Date rollover while the session is open.
    pub fn set_today(&mut self, today: NaiveDate) {
        if today != self.today {
            tracing::info!(%today, "date changed");
            self.today = today;
            self.rebuild();
        }
    }

    /// Called by the renderer with the list body heights of the current frame.
    pub fn set_list_heights(&mut self, main: usize, sidebar: usize) {
        self.viewport.resize(main, self.index.lines().len());
        self.viewport.follow(&self.index, self.cursor);
        self.sidebar_view.resize(sidebar, self.projects.len());
        self.sidebar_view.reveal(self.sidebar_cursor, self.projects.len());
        let groups = self.group_len();
        self.group_view.resize(main, groups);
        self.group_view.reveal(self.group_cursor, groups);
    }

    pub fn project_sections(&self) -> Vec<&Section> {
        let Some(project) = self.nav.project() else {
            return Vec::new();
        };
        let mut sections: Vec<&Section> = self
            .sections
            .iter()
            .filter(|section| section.project_id == project)
            .collect();
        sections.sort_by_key(|section| section.order);
        sections
    }

    pub fn current_project(&self) -> Option<&Project> {
        let id = self.nav.project()?;
        self.projects.iter().find(|project| project.id == id)
    }

    /// Open item count per due date in the month of `day`.
    pub fn day_counts(&self, day: NaiveDate) -> HashMap<NaiveDate, usize> {
        let mut counts = HashMap::new();
        for date in self.items.iter().filter_map(Item::due_date) {
            if date.year() == day.year() && date.month() == day.month() {
                *counts.entry(date).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn label_count(&self, name: &str) -> usize {
        self.items.iter().filter(|item| item.has_label(name)).count()
    }

    /// Item the next item action applies to: the open detail, else the cursor.
    pub fn focused_item(&self) -> Option<&Item> {
        if let Some(Overlay::Detail { item_id }) = self.nav.overlay() {
            return self.item(item_id);
        }
        if self.nav.overlay_open() || self.nav.pane() != Pane::Main || !self.nav.view().lists_items()
        {
            return None;
        }
        self.cursor_item()
    }

    pub fn cursor_item(&self) -> Option<&Item> {
        self.index
            .item_index(self.cursor)
            .and_then(|index| self.visible.get(index))
    }

    fn cursor_target(&self) -> Option<&CursorTarget> {
        self.index.target(self.cursor)
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Status {
            text: text.into(),
            level: Level::Info,
        };
    }

    fn warn(&mut self, text: impl Into<String>) {
        self.status = Status {
            text: text.into(),
            level: Level::Warn,
        };
    }

    fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(status = %text, "error surfaced to status line");
        self.status = Status {
            text,
            level: Level::Error,
        };
    }

    fn request(&mut self, request: Request) {
        self.pending += 1;
        self.effects.push(Effect::Remote(request));
    }

    // ---- derived list -----------------------------------------------------

    fn in_view(&self, view: View, item: &Item) -> bool {
        let today = self.today;
        match view {
            View::Today => item.due_date().is_none_or(|date| date <= today),
            View::Upcoming => {
                let end = today
                    .checked_add_days(Days::new(u64::from(self.upcoming_days)))
                    .unwrap_or(today);
                item.due_date()
                    .is_some_and(|date| date >= today && date <= end)
            }
            View::LabelItems => self.nav.label().is_some_and(|label| item.has_label(label)),
            View::CalendarDay => item.due_date() == Some(self.nav.day()),
            View::Projects => self.nav.project() == Some(item.project_id.as_str()),
            View::LabelList | View::Sections | View::CalendarMonth => false,
        }
    }

    /// Recomputes the visible list, keeping the cursor on the same target.
    fn rebuild(&mut self) {
        let target = self.cursor_target().cloned();
        let view = self.nav.view();
        self.visible = self
            .items
            .iter()
            .filter(|item| self.in_view(view, item))
            .cloned()
            .collect();

        let sections: Vec<Section> = self.project_sections().into_iter().cloned().collect();
        let today = self.today;
        let grouping = match view {
            View::Today => Grouping::StatusBuckets { today },
            View::Projects => Grouping::Sections(&sections),
            View::Upcoming | View::LabelItems | View::CalendarDay => {
                Grouping::DateBuckets { today }
            }
            View::LabelList | View::Sections | View::CalendarMonth => Grouping::Flat,
        };
        self.index = DisplayIndex::build(&self.visible, grouping);
        self.cursor = target
            .and_then(|target| self.index.position_of(&target))
            .unwrap_or_else(|| self.index.clamp(self.cursor));
        self.viewport.follow(&self.index, self.cursor);
        self.group_cursor = self.group_cursor.min(self.group_len().saturating_sub(1));
    }

    fn group_len(&self) -> usize {
        match self.nav.view() {
            View::LabelList => self.labels.len(),
            View::Sections => self.project_sections().len(),
            _ => 0,
        }
    }

    /// Keeps the sidebar cursor and the open project in step.
    fn sync_project(&mut self) {
        if self.nav.view() != View::Projects {
            return;
        }
        self.sidebar_cursor = self.sidebar_cursor.min(self.projects.len().saturating_sub(1));
        let id = self
            .projects
            .get(self.sidebar_cursor)
            .map(|project| project.id.clone());
        if id.as_deref() != self.nav.project() {
            self.nav.set_project(id);
            self.cursor = 0;
            self.rebuild();
        }
        self.sidebar_view
            .reveal(self.sidebar_cursor, self.projects.len());
    }

    fn drop_stale_selection(&mut self) -> usize {
        let before = self.selection.len();
        let live: HashSet<&str> = self.items.iter().map(|item| item.id.as_str()).collect();
        self.selection.retain(|id| live.contains(id.as_str()));
        let dropped = before - self.selection.len();
        if dropped > 0 {
            tracing::info!(dropped, "dropped selection entries no longer loaded");
        }
        dropped
    }

    // ---- actions ------------------------------------------------------------

    /// Runs one resolved action against the current state.
    pub fn apply(&mut self, action: Action) {
        tracing::trace!(action = action.name(), "apply");
        if matches!(self.nav.overlay(), Some(Overlay::Help))
            && !matches!(
                action,
                Action::Back
                    | Action::Help
                    | Action::Quit
                    | Action::MoveUp
                    | Action::MoveDown
                    | Action::PageUp
                    | Action::PageDown
                    | Action::MoveTop
            )
        {
            return;
        }

        match action {
            Action::Quit => self.quit = true,
            Action::Back => self.back(),
            Action::Help => self.toggle_help(),
            Action::SwitchTab(tab) => self.switch_tab(tab),
            Action::NextTab => self.switch_tab(self.nav.tab().next()),
            Action::PrevTab => self.switch_tab(self.nav.tab().prev()),
            Action::Refresh => self.refresh(),
            Action::Undo => self.undo(),
            Action::Search => self.open_search(),
            Action::TogglePanel => {
                let open = self.nav.toggle_panel();
                self.info(if open { "Detail panel on" } else { "Detail panel off" });
            }
            Action::TogglePane => self.nav.toggle_pane(),
            Action::MoveUp
            | Action::MoveDown
            | Action::MoveLeft
            | Action::MoveRight
            | Action::PageUp
            | Action::PageDown
            | Action::MoveTop
            | Action::MoveBottom
            | Action::PrevMonth
            | Action::NextMonth => self.move_cursor(action),
            Action::ToggleSelect => self.toggle_select(),
            Action::SelectAll => self.select_all(),
            Action::ClearSelection => {
                self.selection.clear();
                self.info("Selection cleared");
            }
            Action::Open => self.open(),
            Action::Add => self.add(),
            Action::Edit => self.edit(),
            Action::Delete => self.delete(),
            Action::Comment => self.comment(),
            Action::Copy => self.copy(),
            Action::ToggleComplete => self.toggle_complete(),
            Action::SetPriority(level) => self.set_priority(level),
            Action::DueToday => self.set_due_in(0),
            Action::DueTomorrow => self.set_due_in(1),
            Action::ClearDue => self.clear_due(),
            Action::ManageSections => self.manage_sections(),
            Action::AddProject => self.modal = Some(Modal::Prompt(Prompt::new(PromptKind::AddProject))),
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if self.nav.switch_tab(tab).is_err() {
            self.warn("Close the overlay first");
            return;
        }
        self.keys.reset();
        self.cursor = 0;
        self.group_cursor = 0;
        self.rebuild();
        self.sync_project();
    }

    fn back(&mut self) {
        match self.nav.back() {
            Back::ClosedOverlay(Overlay::Detail { .. }) => self.forget_comments(),
            Back::ClosedOverlay(_) | Back::ClosedPanel | Back::FocusedSidebar | Back::Stay => {}
            Back::Entered(_) => {
                self.cursor = 0;
                self.rebuild();
            }
            Back::LeftTab => {
                self.cursor = 0;
                self.group_cursor = 0;
                self.rebuild();
            }
        }
    }

    fn forget_comments(&mut self) {
        self.comments.clear();
        self.comments_for = None;
        self.overlay_scroll = 0;
    }

    /// Drops the detail overlay of `id` even while the split panel is open.
    fn close_detail_of(&mut self, id: &str) {
        if matches!(self.nav.overlay(), Some(Overlay::Detail { item_id }) if item_id == id) {
            self.nav.close_overlay();
            self.forget_comments();
        }
    }

    fn toggle_help(&mut self) {
        if matches!(self.nav.overlay(), Some(Overlay::Help)) {
            self.nav.close_overlay();
        } else {
            self.overlay_scroll = 0;
            self.nav.open_overlay(Overlay::Help);
        }
    }

    fn refresh(&mut self) {
        self.announce_sync = true;
        self.info("Refreshing...");
        self.request(Request::Snapshot);
    }

    fn open_search(&mut self) {
        let mut search = SearchState::default();
        search.refresh(&self.items);
        self.nav.open_overlay(Overlay::Search(search));
    }

    pub(crate) fn open_detail(&mut self, item_id: String) {
        self.overlay_scroll = 0;
        self.comments.clear();
        self.comments_for = Some(item_id.clone());
        self.request(Request::Comments {
            item_id: item_id.clone(),
        });
        self.nav.open_overlay(Overlay::Detail { item_id });
    }

    fn move_cursor(&mut self, action: Action) {
        if matches!(
            self.nav.overlay(),
            Some(Overlay::Detail { .. } | Overlay::Help)
        ) {
            self.overlay_scroll = match action {
                Action::MoveUp => self.overlay_scroll.saturating_sub(1),
                Action::MoveDown => self.overlay_scroll.saturating_add(1),
                Action::PageUp => self.overlay_scroll.saturating_sub(OVERLAY_PAGE),
                Action::PageDown => self.overlay_scroll.saturating_add(OVERLAY_PAGE),
                Action::MoveTop => 0,
                _ => self.overlay_scroll,
            };
            return;
        }

        let view = self.nav.view();
        match (view, self.nav.pane()) {
            (View::Projects, Pane::Sidebar) => {
                if action == Action::MoveRight {
                    self.nav.focus(Pane::Main);
                    return;
                }
                let page = self.sidebar_view.height().max(1);
                self.sidebar_cursor = step(self.sidebar_cursor, self.projects.len(), action, page);
                self.sync_project();
            }
            (View::CalendarMonth, _) => self.move_day(action),
            (View::LabelList | View::Sections, _) => {
                let len = self.group_len();
                let page = self.group_view.height().max(1);
                self.group_cursor = step(self.group_cursor, len, action, page);
                self.group_view.reveal(self.group_cursor, len);
            }
            (View::CalendarDay, _) if matches!(action, Action::MoveLeft | Action::MoveRight) => {
                let day = self.nav.day();
                let next = if action == Action::MoveLeft {
                    day.pred_opt()
                } else {
                    day.succ_opt()
                };
                if let Some(next) = next {
                    self.nav.set_day(next);
                    self.cursor = 0;
                    self.rebuild();
                }
            }
            (View::Projects, Pane::Main) if action == Action::MoveLeft => {
                self.nav.focus(Pane::Sidebar);
            }
            _ => {
                let page = self.viewport.height().max(1);
                self.cursor = step(self.cursor, self.index.len(), action, page);
                self.viewport.follow(&self.index, self.cursor);
            }
        }
    }

    fn move_day(&mut self, action: Action) {
        let day = self.nav.day();
        let next = match action {
            Action::MoveLeft => day.checked_sub_days(Days::new(1)),
            Action::MoveRight => day.checked_add_days(Days::new(1)),
            Action::MoveUp => day.checked_sub_days(Days::new(7)),
            Action::MoveDown => day.checked_add_days(Days::new(7)),
            Action::PrevMonth | Action::PageUp => day.checked_sub_months(Months::new(1)),
            Action::NextMonth | Action::PageDown => day.checked_add_months(Months::new(1)),
            Action::MoveTop => day.with_day(1),
            Action::MoveBottom => last_day_of_month(day),
            _ => None,
        };
        if let Some(next) = next {
            self.nav.set_day(next);
        }
    }

    fn toggle_select(&mut self) {
        if self.nav.overlay_open() || self.nav.pane() != Pane::Main {
            return;
        }
        let Some(CursorTarget::Item(id)) = self.cursor_target().cloned() else {
            return;
        };
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    fn select_all(&mut self) {
        if !self.nav.view().lists_items() || self.nav.overlay_open() {
            return;
        }
        let ids: Vec<String> = self
            .index
            .ordered()
            .iter()
            .filter_map(|target| target.item_id().map(str::to_string))
            .collect();
        let count = ids.len();
        self.selection.extend(ids);
        self.info(format!("Selected {count} items"));
    }

    fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.selection.iter().cloned().collect();
        ids.sort();
        ids
    }

    fn open(&mut self) {
        if matches!(self.nav.overlay(), Some(Overlay::Detail { .. })) {
            self.edit();
            return;
        }
        if self.nav.overlay_open() {
            return;
        }
        match (self.nav.view(), self.nav.pane()) {
            (View::Projects, Pane::Sidebar) => {
                self.sync_project();
                self.nav.focus(Pane::Main);
            }
            (View::LabelList, _) => {
                if let Some(label) = self.labels.get(self.group_cursor) {
                    let name = label.name.clone();
                    self.nav.open_label(name);
                    self.cursor = 0;
                    self.rebuild();
                }
            }
            (View::Sections, _) => self.rename_section(),
            (View::CalendarMonth, _) => {
                self.nav.open_day(self.nav.day());
                self.cursor = 0;
                self.rebuild();
            }
            _ => {
                // Placeholders have nothing to open.
                if let Some(CursorTarget::Item(id)) = self.cursor_target().cloned() {
                    self.open_detail(id);
                }
            }
        }
    }

    fn add(&mut self) {
        let view = self.nav.view();
        if self.nav.pane() == Pane::Sidebar && view == View::Projects {
            self.modal = Some(Modal::Prompt(Prompt::new(PromptKind::AddProject)));
            return;
        }
        if view == View::Sections {
            if let Some(project_id) = self.nav.project() {
                self.modal = Some(Modal::Prompt(Prompt::new(PromptKind::AddSection {
                    project_id: project_id.to_string(),
                })));
            }
            return;
        }

        let in_list = !self.nav.overlay_open();
        let project_id = (view == View::Projects)
            .then(|| self.nav.project().map(str::to_string))
            .flatten();
        let section_id = match self.cursor_target() {
            Some(CursorTarget::Placeholder(section_id)) if in_list && view == View::Projects => {
                Some(section_id.clone())
            }
            Some(CursorTarget::Item(_)) if in_list && view == View::Projects => {
                self.cursor_item().and_then(|item| item.section_id.clone())
            }
            _ => None,
        };
        let due = match view {
            View::Today => Some(String::from("today")),
            View::CalendarDay | View::CalendarMonth => {
                Some(self.nav.day().format("%Y-%m-%d").to_string())
            }
            _ => None,
        };
        let labels = match view {
            View::LabelItems => self.nav.label().map(str::to_string).into_iter().collect(),
            View::LabelList => self
                .labels
                .get(self.group_cursor)
                .map(|label| label.name.clone())
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };

        let form = TaskForm::create(project_id, section_id, due, labels);
        self.nav.open_overlay(Overlay::Form(Box::new(form)));
    }

    fn edit(&mut self) {
        if self.nav.view() == View::Sections && !self.nav.overlay_open() {
            self.rename_section();
            return;
        }
        let Some(item) = self.focused_item() else {
            return;
        };
        let form = TaskForm::edit(item);
        self.nav.open_overlay(Overlay::Form(Box::new(form)));
    }

    fn rename_section(&mut self) {
        let Some((section_id, name)) = self
            .project_sections()
            .get(self.group_cursor)
            .map(|section| (section.id.clone(), section.name.clone()))
        else {
            return;
        };
        let prompt = Prompt::with_value(PromptKind::RenameSection { section_id }, &name);
        self.modal = Some(Modal::Prompt(prompt));
    }

    fn manage_sections(&mut self) {
        if self.nav.view() != View::Projects || self.nav.overlay_open() {
            return;
        }
        if self.nav.project().is_none() {
            self.warn("Pick a project first");
            return;
        }
        self.group_cursor = 0;
        self.nav.enter(View::Sections);
        self.rebuild();
    }

    fn delete(&mut self) {
        let view = self.nav.view();
        if !self.nav.overlay_open() {
            if view == View::Projects && self.nav.pane() == Pane::Sidebar {
                if let Some(project) = self.projects.get(self.sidebar_cursor) {
                    if project.inbox {
                        self.warn("The inbox cannot be deleted");
                        return;
                    }
                    self.modal = Some(Modal::Confirm(Confirm::DeleteProject {
                        id: project.id.clone(),
                        name: project.name.clone(),
                    }));
                }
                return;
            }
            if view == View::Sections {
                let section = self
                    .project_sections()
                    .get(self.group_cursor)
                    .map(|section| (section.id.clone(), section.name.clone()));
                if let Some((id, name)) = section {
                    self.modal = Some(Modal::Confirm(Confirm::DeleteSection { id, name }));
                }
                return;
            }
        }

        let detail_open = matches!(self.nav.overlay(), Some(Overlay::Detail { .. }));
        if !self.selection.is_empty() && !detail_open {
            self.modal = Some(Modal::Confirm(Confirm::DeleteItems {
                ids: self.selected_ids(),
                bulk: true,
            }));
        } else if let Some(item) = self.focused_item() {
            self.modal = Some(Modal::Confirm(Confirm::DeleteItems {
                ids: vec![item.id.clone()],
                bulk: false,
            }));
        }
    }

    pub(crate) fn confirmed(&mut self, confirm: Confirm) {
        match confirm {
            Confirm::DeleteItems { ids, bulk: true } => {
                self.info(format!("Deleting {} items...", ids.len()));
                self.request(Request::Bulk {
                    op: BulkOp::Delete,
                    ids,
                });
            }
            Confirm::DeleteItems { ids, bulk: false } => {
                for id in ids {
                    self.close_detail_of(&id);
                    self.request(Request::Delete { id });
                }
            }
            Confirm::DeleteProject { id, .. } => self.request(Request::DeleteProject { id }),
            Confirm::DeleteSection { id, .. } => self.request(Request::DeleteSection { id }),
        }
    }

    fn comment(&mut self) {
        let Some(item) = self.focused_item() else {
            return;
        };
        let kind = PromptKind::AddComment {
            item_id: item.id.clone(),
        };
        self.modal = Some(Modal::Prompt(Prompt::new(kind)));
    }

    pub(crate) fn submit_prompt(&mut self, kind: PromptKind, value: String) {
        let request = match kind {
            PromptKind::AddProject => Request::CreateProject { name: value },
            PromptKind::AddSection { project_id } => Request::CreateSection {
                project_id,
                name: value,
            },
            PromptKind::RenameSection { section_id } => Request::RenameSection {
                id: section_id,
                name: value,
            },
            PromptKind::AddComment { item_id } => Request::AddComment {
                item_id,
                text: value,
            },
        };
        self.request(request);
    }

    pub(crate) fn submit_form(&mut self, submission: Submission) {
        match submission {
            Submission::Create(item) => {
                self.info("Adding task...");
                self.request(Request::Create(item));
            }
            Submission::Update { patch, .. } if patch.is_empty() => self.info("No changes"),
            Submission::Update { item_id, patch } => {
                self.info("Saving...");
                self.request(Request::Update { id: item_id, patch });
            }
        }
    }

    fn copy(&mut self) {
        let detail_open = matches!(self.nav.overlay(), Some(Overlay::Detail { .. }));
        if !self.selection.is_empty() && !detail_open {
            let lines: Vec<&str> = self
                .items
                .iter()
                .filter(|item| self.selection.contains(&item.id))
                .map(|item| item.content.as_str())
                .collect();
            let effect = Effect::Clipboard {
                text: lines.join("\n"),
                count: lines.len(),
                bulk: true,
            };
            self.pending += 1;
            self.effects.push(effect);
        } else if let Some(item) = self.focused_item() {
            let effect = Effect::Clipboard {
                text: item.content.clone(),
                count: 1,
                bulk: false,
            };
            self.pending += 1;
            self.effects.push(effect);
        }
    }

    fn toggle_complete(&mut self) {
        let detail_open = matches!(self.nav.overlay(), Some(Overlay::Detail { .. }));
        if !self.selection.is_empty() && !detail_open {
            let ids = self.selected_ids();
            let all_checked = ids
                .iter()
                .all(|id| self.item(id).is_some_and(|item| item.checked));
            let op = if all_checked {
                BulkOp::Uncomplete
            } else {
                BulkOp::Complete
            };
            self.info(format!("{} {} items...", verb(op), ids.len()));
            self.request(Request::Bulk { op, ids });
            return;
        }

        let Some(item) = self.focused_item() else {
            return;
        };
        let id = item.id.clone();
        let checked = !item.checked;
        self.set_checked_locally(&id, checked);
        self.request(Request::SetChecked {
            id,
            checked,
            undo: false,
        });
    }

    fn set_checked_locally(&mut self, id: &str, checked: bool) {
        self.update_locally(id, |item| item.checked = checked);
    }

    /// Optimistic edit of the cached item; the follow-up fetch settles it.
    fn update_locally(&mut self, id: &str, edit: impl Fn(&mut Item)) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            edit(item);
        }
        self.rebuild();
    }

    fn undo(&mut self) {
        let Some(record) = self.undo.take() else {
            self.info("Nothing to undo");
            return;
        };
        let checked = !record.completed;
        self.set_checked_locally(&record.item_id, checked);
        self.request(Request::SetChecked {
            id: record.item_id.clone(),
            checked,
            undo: true,
        });
        self.undoing = Some(record);
    }

    fn quick_edit(&mut self, patch: ItemPatch, edit: impl Fn(&mut Item)) {
        let Some(item) = self.focused_item() else {
            return;
        };
        let id = item.id.clone();
        self.update_locally(&id, edit);
        self.request(Request::Update { id, patch });
    }

    fn set_priority(&mut self, level: u8) {
        let Some(priority) = Priority::from_display(level) else {
            return;
        };
        let patch = ItemPatch {
            priority: Some(priority),
            ..ItemPatch::default()
        };
        self.quick_edit(patch, move |item| item.priority = priority);
    }

    fn set_due_in(&mut self, days: u64) {
        let Some(date) = self.today.checked_add_days(Days::new(days)) else {
            return;
        };
        let patch = ItemPatch {
            due_date: Some(date.format("%Y-%m-%d").to_string()),
            ..ItemPatch::default()
        };
        self.quick_edit(patch, move |item| item.due = Some(Due::on(date)));
    }

    fn clear_due(&mut self) {
        let patch = ItemPatch {
            due_string: Some(String::from("no date")),
            ..ItemPatch::default()
        };
        self.quick_edit(patch, |item| item.due = None);
    }
}

fn verb(op: BulkOp) -> &'static str {
    match op {
        BulkOp::Complete => "Completing",
        BulkOp::Uncomplete => "Reopening",
        BulkOp::Delete => "Deleting",
    }
}

/// Moves a list cursor for a movement action, clamped to `[0, len)`.
fn step(current: usize, len: usize, action: Action, page: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last = len - 1;
    match action {
        Action::MoveUp => current.saturating_sub(1),
        Action::MoveDown => current.saturating_add(1).min(last),
        Action::PageUp => current.saturating_sub(page),
        Action::PageDown => current.saturating_add(page).min(last),
        Action::MoveTop => 0,
        Action::MoveBottom => last,
        _ => current.min(last),
    }
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub fn last_day_of_month(day: NaiveDate) -> Option<NaiveDate> {
    first_day_of_month(day)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_clamps_to_bounds() {
        assert_eq!(step(0, 5, Action::MoveUp, 3), 0);
        assert_eq!(step(4, 5, Action::MoveDown, 3), 4);
        assert_eq!(step(1, 5, Action::PageDown, 3), 4);
        assert_eq!(step(3, 5, Action::PageUp, 10), 0);
        assert_eq!(step(2, 0, Action::MoveBottom, 3), 0);
    }

    #[test]
    fn month_edges() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 14).expect("date");
        assert_eq!(first_day_of_month(day).day(), 1);
        assert_eq!(last_day_of_month(day).map(|d| d.day()), Some(29));
    }
}
