//! Incremental fuzzy search over the cached items.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::forms::{Entry, TextInput};
use crate::model::Item;

const MAX_RESULTS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: TextInput,
    results: Vec<String>,
    cursor: usize,
}

impl SearchState {
    pub fn results(&self) -> &[String] {
        &self.results
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Option<&str> {
        self.results.get(self.cursor).map(String::as_str)
    }

    /// Re-ranks `items` against the current query.
    pub fn refresh(&mut self, items: &[Item]) {
        let query = self.query.value().trim().to_lowercase();
        let mut scored: Vec<(i64, usize)> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| fuzzy_score(&query, &item.search_blob()).map(|s| (s, idx)))
            .collect();
        // Stable: equal scores keep cache order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        self.results = scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, idx)| items[idx].id.clone())
            .collect();
        self.cursor = self.cursor.min(self.results.len().saturating_sub(1));
    }

    /// Editing keys change the query; arrows move through results.
    pub fn handle_key(&mut self, key: &KeyEvent, items: &[Item]) -> Entry {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Entry::Cancel,
            KeyCode::Enter => return Entry::Submit,
            KeyCode::Up => self.step(-1),
            KeyCode::Char('p') if ctrl => self.step(-1),
            KeyCode::Down => self.step(1),
            KeyCode::Char('n') if ctrl => self.step(1),
            _ => {
                if self.query.edit(key) {
                    self.cursor = 0;
                    self.refresh(items);
                }
            }
        }
        Entry::Editing
    }

    fn step(&mut self, delta: isize) {
        if self.results.is_empty() {
            return;
        }
        let last = self.results.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }
}

/// Scores `query` as an in-order subsequence of `haystack`.
///
/// Adjacent hits build a growing bonus. A skipped stretch between hits costs
/// at most `MAX_GAP_COST`.
pub fn fuzzy_score(query: &str, haystack: &str) -> Option<i64> {
    const HIT: i64 = 8;
    const RUN_STEP: i64 = 6;
    const WORD_START: i64 = 5;
    const MAX_GAP_COST: i64 = 4;

    let mut wanted = query.chars().flat_map(char::to_lowercase).peekable();
    if wanted.peek().is_none() {
        return Some(0);
    }

    let mut total = 0i64;
    let mut run = 0i64;
    let mut last_hit: Option<usize> = None;
    let mut at_word_start = true;
    let mut length = 0usize;

    for (pos, ch) in haystack.chars().flat_map(char::to_lowercase).enumerate() {
        length = pos + 1;
        let boundary = at_word_start;
        at_word_start = is_separator(ch);
        let Some(&next) = wanted.peek() else {
            continue;
        };
        if ch != next {
            continue;
        }
        wanted.next();
        total += HIT;
        match last_hit {
            Some(prev) if pos == prev + 1 => {
                run += 1;
                total += RUN_STEP * run;
            }
            Some(prev) => {
                run = 0;
                total -= ((pos - prev - 1) as i64).min(MAX_GAP_COST);
            }
            None => run = 0,
        }
        if boundary {
            total += WORD_START;
        }
        last_hit = Some(pos);
    }

    if wanted.peek().is_some() {
        return None;
    }
    Some(total - length as i64 / 8)
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '/' | '_' | '-' | '.' | '@' | ':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, content: &str) -> Item {
        Item {
            id: id.into(),
            content: content.into(),
            ..Item::default()
        }
    }

    #[test]
    fn fuzzy_prefers_contiguous_word_starts() {
        let tight = fuzzy_score("milk", "buy milk").expect("match");
        let loose = fuzzy_score("milk", "make it look kind").expect("match");
        assert!(tight > loose);
        assert_eq!(fuzzy_score("xyz", "buy milk"), None);
    }

    #[test]
    fn typing_filters_and_arrows_move() {
        let items = vec![
            item("1", "Buy milk"),
            item("2", "Call plumber"),
            item("3", "Mow lawn"),
        ];
        let mut search = SearchState::default();
        search.refresh(&items);
        assert_eq!(search.results().len(), 3);

        for ch in "m".chars() {
            search.handle_key(&KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE), &items);
        }
        assert_eq!(search.results().len(), 3);
        search.handle_key(&KeyEvent::new(KeyCode::Char('i'), KeyModifiers::NONE), &items);
        assert_eq!(search.results(), ["1"]);

        search.handle_key(&KeyEvent::new(KeyCode::Down, KeyModifiers::NONE), &items);
        assert_eq!(search.selected(), Some("1"));
        assert_eq!(
            search.handle_key(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &items),
            Entry::Submit
        );
    }
}
