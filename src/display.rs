//! Turns an item collection plus a grouping policy into display lines.
//!
//! The output is rebuilt from scratch on every change. Only item lines and
//! empty-section placeholders are selectable; headers and blank separators
//! are skipped by the cursor.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::model::{Item, Section};

const MAX_SUBTASK_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayLine {
    /// `index` points into the item slice the index was built from.
    Item { index: usize, depth: usize },
    Header { label: String },
    Placeholder { section_id: String, section_name: String },
    Blank,
}

/// What a cursor position stands for, independent of where it is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CursorTarget {
    Item(String),
    Placeholder(String),
}

impl CursorTarget {
    pub fn item_id(&self) -> Option<&str> {
        match self {
            CursorTarget::Item(id) => Some(id),
            CursorTarget::Placeholder(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping<'a> {
    Flat,
    Sections(&'a [Section]),
    StatusBuckets { today: NaiveDate },
    DateBuckets { today: NaiveDate },
}

#[derive(Debug, Clone, Default)]
pub struct DisplayIndex {
    lines: Vec<DisplayLine>,
    ordered: Vec<CursorTarget>,
    cursor_lines: Vec<usize>,
    positions: HashMap<CursorTarget, usize>,
}

impl DisplayIndex {
    pub fn build(items: &[Item], grouping: Grouping<'_>) -> Self {
        let mut builder = Builder::new(items);
        match grouping {
            Grouping::Flat => {
                for index in 0..items.len() {
                    builder.push_item(index);
                }
            }
            Grouping::Sections(sections) => builder.sections(sections),
            Grouping::StatusBuckets { today } => builder.status_buckets(today),
            Grouping::DateBuckets { today } => builder.date_buckets(today),
        }
        builder.finish()
    }

    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    pub fn ordered(&self) -> &[CursorTarget] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn target(&self, cursor: usize) -> Option<&CursorTarget> {
        self.ordered.get(cursor)
    }

    /// Display line drawn for the given cursor position.
    pub fn line_of(&self, cursor: usize) -> Option<usize> {
        self.cursor_lines.get(cursor).copied()
    }

    pub fn position_of(&self, target: &CursorTarget) -> Option<usize> {
        self.positions.get(target).copied()
    }

    pub fn position_of_item(&self, id: &str) -> Option<usize> {
        self.position_of(&CursorTarget::Item(id.to_string()))
    }

    /// Inverse of `line_of`; `None` for headers, blanks, and out-of-range lines.
    pub fn cursor_at_line(&self, line: usize) -> Option<usize> {
        self.cursor_lines.binary_search(&line).ok()
    }

    /// Index into the source item slice for the cursor position, if it is an item.
    pub fn item_index(&self, cursor: usize) -> Option<usize> {
        match self.lines.get(self.line_of(cursor)?)? {
            DisplayLine::Item { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Keeps a cursor inside `[0, len)`, or 0 for an empty index.
    pub fn clamp(&self, cursor: usize) -> usize {
        cursor.min(self.len().saturating_sub(1))
    }
}

struct Builder<'a> {
    items: &'a [Item],
    depths: Vec<usize>,
    index: DisplayIndex,
}

impl<'a> Builder<'a> {
    fn new(items: &'a [Item]) -> Self {
        Self {
            items,
            depths: subtask_depths(items),
            index: DisplayIndex::default(),
        }
    }

    fn push_line(&mut self, line: DisplayLine) {
        self.index.lines.push(line);
    }

    fn push_selectable(&mut self, line: DisplayLine, target: CursorTarget) {
        let cursor = self.index.ordered.len();
        self.index.cursor_lines.push(self.index.lines.len());
        self.index.positions.insert(target.clone(), cursor);
        self.index.ordered.push(target);
        self.index.lines.push(line);
    }

    fn push_item(&mut self, index: usize) {
        let target = CursorTarget::Item(self.items[index].id.clone());
        let depth = self.depths[index];
        self.push_selectable(DisplayLine::Item { index, depth }, target);
    }

    fn push_bucket(&mut self, label: String, bucket: &[usize]) {
        if !self.index.lines.is_empty() {
            self.push_line(DisplayLine::Blank);
        }
        self.push_line(DisplayLine::Header { label });
        for &index in bucket {
            self.push_item(index);
        }
    }

    fn sections(&mut self, sections: &[Section]) {
        let items = self.items;
        let mut ordered_sections: Vec<&Section> = sections.iter().collect();
        ordered_sections.sort_by_key(|section| section.order);

        let mut by_section: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut unsectioned = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match item.section_id.as_deref() {
                Some(id) if sections.iter().any(|s| s.id == id) => {
                    by_section.entry(id).or_default().push(index);
                }
                _ => unsectioned.push(index),
            }
        }

        sort_bucket(items, &mut unsectioned);
        for index in unsectioned {
            self.push_item(index);
        }

        for section in ordered_sections {
            match by_section.remove(section.id.as_str()) {
                Some(mut bucket) => {
                    sort_bucket(items, &mut bucket);
                    self.push_line(DisplayLine::Header {
                        label: section.name.clone(),
                    });
                    for index in bucket {
                        self.push_item(index);
                    }
                }
                None => self.push_selectable(
                    DisplayLine::Placeholder {
                        section_id: section.id.clone(),
                        section_name: section.name.clone(),
                    },
                    CursorTarget::Placeholder(section.id.clone()),
                ),
            }
        }
    }

    fn status_buckets(&mut self, today: NaiveDate) {
        let mut overdue = Vec::new();
        let mut due_today = Vec::new();
        let mut undated = Vec::new();
        let mut later = Vec::new();

        for (index, item) in self.items.iter().enumerate() {
            match item.due_date() {
                Some(date) if date < today => overdue.push(index),
                Some(date) if date == today => due_today.push(index),
                Some(_) => later.push(index),
                None => undated.push(index),
            }
        }

        for (label, mut bucket) in [
            ("Overdue", overdue),
            ("Today", due_today),
            ("No date", undated),
            ("Later", later),
        ] {
            if bucket.is_empty() {
                continue;
            }
            sort_bucket(self.items, &mut bucket);
            self.push_bucket(label.to_string(), &bucket);
        }
    }

    fn date_buckets(&mut self, today: NaiveDate) {
        let items = self.items;
        let mut dated: Vec<usize> = Vec::new();
        let mut undated: Vec<usize> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if item.due.is_some() {
                dated.push(index);
            } else {
                undated.push(index);
            }
        }
        sort_bucket(items, &mut dated);

        let mut start = 0;
        while start < dated.len() {
            let date = items[dated[start]].due_date();
            let end = dated[start..]
                .iter()
                .position(|&index| items[index].due_date() != date)
                .map_or(dated.len(), |offset| start + offset);
            if let Some(date) = date {
                self.push_bucket(day_label(date, today), &dated[start..end]);
            }
            start = end;
        }

        if !undated.is_empty() {
            sort_bucket(items, &mut undated);
            self.push_bucket(String::from("No date"), &undated);
        }
    }

    fn finish(self) -> DisplayIndex {
        self.index
    }
}

/// Orders positions inside a bucket: dated before undated, then by date and
/// time, then by urgency. Equal keys keep their source order.
pub fn sort_bucket(items: &[Item], bucket: &mut [usize]) {
    bucket.sort_by(|&a, &b| compare_items(&items[a], &items[b]));
}

pub fn compare_items(a: &Item, b: &Item) -> Ordering {
    let due_order = match (&a.due, &b.due) {
        (Some(x), Some(y)) => x.sort_key().cmp(&y.sort_key()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    due_order.then_with(|| b.priority.cmp(&a.priority))
}

/// Header text for a date bucket.
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        return String::from("Today");
    }
    if today.checked_add_days(Days::new(1)) == Some(date) {
        return String::from("Tomorrow");
    }
    if today.checked_sub_days(Days::new(1)) == Some(date) {
        return String::from("Yesterday");
    }
    date.format("%a %d %b").to_string()
}

fn subtask_depths(items: &[Item]) -> Vec<usize> {
    let parents: HashMap<&str, Option<&str>> = items
        .iter()
        .map(|item| (item.id.as_str(), item.parent_id.as_deref()))
        .collect();

    items
        .iter()
        .map(|item| {
            let mut depth = 0;
            let mut parent = item.parent_id.as_deref();
            while let Some(id) = parent {
                let Some(next) = parents.get(id) else {
                    break;
                };
                depth += 1;
                if depth >= MAX_SUBTASK_DEPTH {
                    break;
                }
                parent = *next;
            }
            depth
        })
        .collect()
}
