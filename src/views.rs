//! Tabs, views, panes and the rules for moving between them.

use chrono::NaiveDate;

use crate::error::ConfigError;
use crate::forms::TaskForm;
use crate::search::SearchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Today,
    Upcoming,
    Projects,
    Labels,
    Calendar,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Today,
        Tab::Upcoming,
        Tab::Projects,
        Tab::Labels,
        Tab::Calendar,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Today => "Today",
            Tab::Upcoming => "Upcoming",
            Tab::Projects => "Projects",
            Tab::Labels => "Labels",
            Tab::Calendar => "Calendar",
        }
    }

    pub fn position(self) -> usize {
        Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// The view a tab opens on.
    pub fn home(self) -> View {
        match self {
            Tab::Today => View::Today,
            Tab::Upcoming => View::Upcoming,
            Tab::Projects => View::Projects,
            Tab::Labels => View::LabelList,
            Tab::Calendar => View::CalendarMonth,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|tab| tab.title().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| ConfigError::UnknownTab(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Today,
    Upcoming,
    LabelList,
    LabelItems,
    CalendarMonth,
    CalendarDay,
    Projects,
    Sections,
}

impl View {
    pub fn tab(self) -> Tab {
        match self {
            View::Today => Tab::Today,
            View::Upcoming => Tab::Upcoming,
            View::LabelList | View::LabelItems => Tab::Labels,
            View::CalendarMonth | View::CalendarDay => Tab::Calendar,
            View::Projects | View::Sections => Tab::Projects,
        }
    }

    /// One level up inside the same tab.
    pub fn parent(self) -> Option<View> {
        match self {
            View::LabelItems => Some(View::LabelList),
            View::CalendarDay => Some(View::CalendarMonth),
            View::Sections => Some(View::Projects),
            _ => None,
        }
    }

    /// Whether the main pane shows a cursor-addressable item list.
    pub fn lists_items(self) -> bool {
        matches!(
            self,
            View::Today | View::Upcoming | View::LabelItems | View::CalendarDay | View::Projects
        )
    }

    pub fn has_sidebar(self) -> bool {
        self == View::Projects
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Sidebar,
    Main,
}

/// Full-screen layers stacked over the current view.
///
/// Text-entry overlays carry their own editing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Detail { item_id: String },
    Form(Box<TaskForm>),
    Search(SearchState),
    Help,
}

impl Overlay {
    pub fn title(&self) -> &'static str {
        match self {
            Overlay::Detail { .. } => "Task",
            Overlay::Form(form) if form.is_edit() => "Edit task",
            Overlay::Form(_) => "New task",
            Overlay::Search(_) => "Search",
            Overlay::Help => "Help",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Back {
    ClosedPanel,
    ClosedOverlay(Overlay),
    FocusedSidebar,
    Entered(View),
    LeftTab,
    Stay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabRefused {
    OverlayOpen,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    view: View,
    pane: Pane,
    overlays: Vec<Overlay>,
    panel: bool,
    label: Option<String>,
    project: Option<String>,
    day: NaiveDate,
}

impl Navigator {
    pub fn new(tab: Tab, today: NaiveDate) -> Self {
        Self {
            view: tab.home(),
            pane: initial_pane(tab),
            overlays: Vec::new(),
            panel: false,
            label: None,
            project: None,
            day: today,
        }
    }

    pub fn tab(&self) -> Tab {
        self.view.tab()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlays.last()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        self.overlays.last_mut()
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn overlay_open(&self) -> bool {
        !self.overlays.is_empty()
    }

    pub fn panel_open(&self) -> bool {
        self.panel
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn set_day(&mut self, day: NaiveDate) {
        self.day = day;
    }

    pub fn set_project(&mut self, project: Option<String>) {
        self.project = project;
    }

    /// Switches to the home view of `tab`; refused while an overlay is open.
    pub fn switch_tab(&mut self, tab: Tab) -> Result<(), TabRefused> {
        if self.overlay_open() {
            return Err(TabRefused::OverlayOpen);
        }
        self.view = tab.home();
        self.pane = initial_pane(tab);
        self.label = None;
        tracing::debug!(tab = tab.title(), "switched tab");
        Ok(())
    }

    pub fn open_label(&mut self, label: String) {
        self.label = Some(label);
        self.enter(View::LabelItems);
    }

    pub fn open_day(&mut self, day: NaiveDate) {
        self.day = day;
        self.enter(View::CalendarDay);
    }

    pub fn enter(&mut self, view: View) {
        self.view = view;
        self.pane = if view.has_sidebar() && self.project.is_none() {
            Pane::Sidebar
        } else {
            Pane::Main
        };
    }

    pub fn focus(&mut self, pane: Pane) {
        if pane == Pane::Sidebar && !self.view.has_sidebar() {
            return;
        }
        self.pane = pane;
    }

    pub fn toggle_pane(&mut self) {
        let next = match self.pane {
            Pane::Sidebar => Pane::Main,
            Pane::Main => Pane::Sidebar,
        };
        self.focus(next);
    }

    pub fn toggle_panel(&mut self) -> bool {
        self.panel = !self.panel;
        self.panel
    }

    pub fn open_overlay(&mut self, overlay: Overlay) {
        // Reopening the same kind replaces it instead of stacking duplicates.
        if let Some(top) = self.overlays.last()
            && std::mem::discriminant(top) == std::mem::discriminant(&overlay)
        {
            self.overlays.pop();
        }
        self.overlays.push(overlay);
    }

    pub fn close_overlay(&mut self) -> Option<Overlay> {
        self.overlays.pop()
    }

    pub fn close_all_overlays(&mut self) {
        self.overlays.clear();
    }

    /// One step of back navigation.
    pub fn back(&mut self) -> Back {
        if self.overlay_open() {
            if self.panel {
                self.panel = false;
                return Back::ClosedPanel;
            }
            return match self.overlays.pop() {
                Some(overlay) => Back::ClosedOverlay(overlay),
                None => Back::Stay,
            };
        }

        if let Some(parent) = self.view.parent() {
            if self.view == View::LabelItems {
                self.label = None;
            }
            self.view = parent;
            self.pane = Pane::Main;
            return Back::Entered(parent);
        }

        if self.view.has_sidebar() && self.pane == Pane::Main {
            self.pane = Pane::Sidebar;
            return Back::FocusedSidebar;
        }

        if self.view == View::Today {
            return Back::Stay;
        }

        self.view = View::Today;
        self.pane = Pane::Main;
        self.label = None;
        Back::LeftTab
    }
}

fn initial_pane(tab: Tab) -> Pane {
    if tab == Tab::Projects {
        Pane::Sidebar
    } else {
        Pane::Main
    }
}
