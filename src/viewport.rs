//! Visible window over the display lines of the main list.

use crate::display::DisplayIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    height: usize,
    offset: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self { height, offset: 0 }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Range of display lines currently on screen.
    pub fn window(&self, total: usize) -> std::ops::Range<usize> {
        let end = self.offset.saturating_add(self.height).min(total);
        self.offset.min(end)..end
    }

    /// Scrolls the least amount needed for `line` to be on screen.
    pub fn reveal(&mut self, line: usize, total: usize) {
        let visible = self.height.max(1);
        if line < self.offset {
            self.offset = line;
        } else if line >= self.offset + visible {
            self.offset = line + 1 - visible;
        }
        self.clamp(total);
    }

    /// Follows the cursor; `index` maps it to its display line.
    pub fn follow(&mut self, index: &DisplayIndex, cursor: usize) {
        let total = index.lines().len();
        match index.line_of(cursor) {
            Some(line) => {
                // Keep the header above the first item of a bucket visible.
                if cursor == 0 {
                    self.offset = 0;
                }
                self.reveal(line, total);
            }
            None => {
                self.offset = 0;
                self.clamp(total);
            }
        }
    }

    /// Terminal resize: only the window bounds change.
    pub fn resize(&mut self, height: usize, total: usize) {
        self.height = height;
        self.clamp(total);
    }

    pub fn scroll_by(&mut self, delta: isize, total: usize) {
        self.offset = self.offset.saturating_add_signed(delta);
        self.clamp(total);
    }

    fn clamp(&mut self, total: usize) {
        let max_offset = total.saturating_sub(self.height);
        self.offset = self.offset.min(max_offset);
    }

    /// Display line under a screen row, if the row falls inside the list body.
    pub fn line_at_row(&self, screen_row: usize, header_rows: usize) -> Option<usize> {
        let relative = screen_row.checked_sub(header_rows)?;
        if relative >= self.height {
            return None;
        }
        Some(relative + self.offset)
    }

    /// Pointer reverse mapping: screen row to cursor position.
    pub fn cursor_at_row(
        &self,
        index: &DisplayIndex,
        screen_row: usize,
        header_rows: usize,
    ) -> Option<usize> {
        let line = self.line_at_row(screen_row, header_rows)?;
        index.cursor_at_line(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Grouping;
    use crate::model::{Due, Item};
    use chrono::NaiveDate;

    fn items(count: usize) -> Vec<Item> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        (0..count)
            .map(|n| Item {
                id: format!("i{n}"),
                content: format!("item {n}"),
                due: (n % 3 != 0).then(|| Due::on(base + chrono::Days::new((n % 5) as u64))),
                ..Item::default()
            })
            .collect()
    }

    #[test]
    fn every_cursor_position_ends_up_on_screen() {
        let items = items(40);
        let index = DisplayIndex::build(
            &items,
            Grouping::DateBuckets {
                today: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            },
        );
        let mut viewport = Viewport::new(7);
        let order: Vec<usize> = (0..index.len()).chain((0..index.len()).rev()).collect();
        for cursor in order {
            viewport.follow(&index, cursor);
            let line = index.line_of(cursor).expect("line");
            assert!(viewport.window(index.lines().len()).contains(&line));
        }
    }

    #[test]
    fn offset_is_clamped_to_content() {
        let mut viewport = Viewport::new(10);
        viewport.scroll_by(50, 12);
        assert_eq!(viewport.offset(), 2);
        viewport.resize(20, 12);
        assert_eq!(viewport.offset(), 0);
    }

    #[test]
    fn rows_map_back_to_cursor_positions() {
        let items = items(6);
        let index = DisplayIndex::build(
            &items,
            Grouping::StatusBuckets {
                today: NaiveDate::from_ymd_opt(2024, 1, 3).expect("date"),
            },
        );
        let viewport = Viewport::new(20);
        // Row 1 is the list title; row 2 is the first header line.
        assert_eq!(viewport.cursor_at_row(&index, 2, 2), None);
        assert_eq!(viewport.cursor_at_row(&index, 3, 2), Some(0));
        assert_eq!(viewport.cursor_at_row(&index, 0, 2), None);
    }
}
