//! Routing of raw terminal events: modal dialogs first, then text-entry
//! overlays, then the key machine. Mouse events map through the hit areas
//! recorded by the last frame.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;

use crate::forms::{Confirm, Entry, Modal};
use crate::keymap::Action;
use crate::views::{Overlay, Pane, View};

use super::App;

impl App {
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => {
                tracing::debug!(width, height, "terminal resized");
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        if self.modal.is_some() {
            self.modal_key(key);
            return;
        }
        if matches!(self.nav.overlay(), Some(Overlay::Form(_))) {
            self.form_key(key);
            return;
        }
        if matches!(self.nav.overlay(), Some(Overlay::Search(_))) {
            self.search_key(key);
            return;
        }

        if let Some(action) = self.keys.dispatch(&key) {
            self.apply(action);
        }
    }

    fn modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.modal.take() else {
            return;
        };
        match modal {
            Modal::Prompt(mut prompt) => match prompt.handle_key(&key) {
                Entry::Editing => self.modal = Some(Modal::Prompt(prompt)),
                Entry::Cancel => self.info("Cancelled"),
                Entry::Submit => match prompt.value() {
                    Ok(value) => self.submit_prompt(prompt.kind, value),
                    Err(err) => {
                        prompt.error = Some(err);
                        self.modal = Some(Modal::Prompt(prompt));
                    }
                },
            },
            Modal::Confirm(confirm) => match Confirm::answer(&key) {
                None => self.modal = Some(Modal::Confirm(confirm)),
                Some(false) => self.info("Cancelled"),
                Some(true) => self.confirmed(confirm),
            },
        }
    }

    fn form_key(&mut self, key: KeyEvent) {
        let today = self.today;
        let Some(Overlay::Form(form)) = self.nav.overlay_mut() else {
            return;
        };
        let submission = match form.handle_key(&key) {
            Entry::Editing => return,
            Entry::Cancel => None,
            Entry::Submit => match form.submission(today) {
                Ok(submission) => Some(submission),
                Err(err) => {
                    form.error = Some(err);
                    return;
                }
            },
        };
        self.nav.close_overlay();
        match submission {
            Some(submission) => self.submit_form(submission),
            None => self.info("Discarded"),
        }
    }

    fn search_key(&mut self, key: KeyEvent) {
        let Some(Overlay::Search(search)) = self.nav.overlay_mut() else {
            return;
        };
        match search.handle_key(&key, &self.items) {
            Entry::Editing => {}
            Entry::Cancel => {
                self.nav.close_overlay();
            }
            Entry::Submit => {
                if let Some(id) = search.selected().map(str::to_string) {
                    self.open_detail(id);
                }
            }
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.modal.is_some() {
            return;
        }
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.click(x, y),
            MouseEventKind::ScrollUp => self.wheel(x, y, Action::MoveUp),
            MouseEventKind::ScrollDown => self.wheel(x, y, Action::MoveDown),
            _ => {}
        }
    }

    fn click(&mut self, x: u16, y: u16) {
        if let Some(tab) = self
            .hits
            .tabs
            .iter()
            .find(|(_, rect)| point_in_rect(x, y, *rect))
            .map(|(tab, _)| *tab)
        {
            self.apply(Action::SwitchTab(tab));
            return;
        }
        if self.nav.overlay_open() {
            return;
        }

        if let Some(rect) = self.hits.sidebar
            && point_in_rect(x, y, rect)
        {
            self.nav.focus(Pane::Sidebar);
            if let Some(row) = self.sidebar_view.line_at_row(usize::from(y), body_top(rect))
                && row < self.projects.len()
            {
                self.sidebar_cursor = row;
                self.sync_project();
            }
            return;
        }

        if let Some(day) = self
            .hits
            .days
            .iter()
            .find(|(_, rect)| point_in_rect(x, y, *rect))
            .map(|(day, _)| *day)
        {
            if day == self.nav.day() {
                self.apply(Action::Open);
            } else {
                self.nav.set_day(day);
            }
            return;
        }

        let Some(rect) = self.hits.main else {
            return;
        };
        if !point_in_rect(x, y, rect) {
            return;
        }
        self.nav.focus(Pane::Main);
        match self.nav.view() {
            View::LabelList | View::Sections => {
                if let Some(row) = self.group_view.line_at_row(usize::from(y), body_top(rect))
                    && row < self.group_len()
                {
                    self.group_cursor = row;
                }
            }
            view if view.lists_items() => {
                if let Some(cursor) =
                    self.viewport
                        .cursor_at_row(&self.index, usize::from(y), body_top(rect))
                {
                    self.cursor = cursor;
                    self.viewport.follow(&self.index, cursor);
                }
            }
            _ => {}
        }
    }

    fn wheel(&mut self, x: u16, y: u16, action: Action) {
        if self.nav.overlay_open() {
            self.apply(action);
            return;
        }
        if let Some(rect) = self.hits.sidebar
            && point_in_rect(x, y, rect)
        {
            self.nav.focus(Pane::Sidebar);
        } else if self.hits.main.is_some_and(|rect| point_in_rect(x, y, rect)) {
            self.nav.focus(Pane::Main);
        } else {
            return;
        }
        self.apply(action);
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

/// First screen row of a bordered pane's body.
fn body_top(pane: Rect) -> usize {
    usize::from(pane.y.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_in_rect_excludes_far_edges() {
        let rect = Rect::new(2, 3, 4, 2);
        assert!(point_in_rect(2, 3, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 4, rect));
        assert!(!point_in_rect(5, 5, rect));
    }
}
