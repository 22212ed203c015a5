//! Key bindings and the two-key sequence state machine.
//!
//! Modal sub-states (prompts, confirmations, the task form, search input)
//! are resolved by the caller before a key ever reaches [`KeyMachine`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::ConfigError;
use crate::views::Tab;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PageUp,
    PageDown,
    MoveTop,
    MoveBottom,
    PrevMonth,
    NextMonth,
    ToggleSelect,
    SelectAll,
    ClearSelection,
    SwitchTab(Tab),
    NextTab,
    PrevTab,
    Open,
    Add,
    Edit,
    Delete,
    Search,
    Help,
    SetPriority(u8),
    DueToday,
    DueTomorrow,
    ClearDue,
    ToggleComplete,
    Copy,
    Comment,
    TogglePane,
    TogglePanel,
    Refresh,
    Undo,
    ManageSections,
    AddProject,
    Back,
    Quit,
}

const NAMED_ACTIONS: &[(&str, Action)] = &[
    ("move_up", Action::MoveUp),
    ("move_down", Action::MoveDown),
    ("move_left", Action::MoveLeft),
    ("move_right", Action::MoveRight),
    ("page_up", Action::PageUp),
    ("page_down", Action::PageDown),
    ("move_top", Action::MoveTop),
    ("move_bottom", Action::MoveBottom),
    ("prev_month", Action::PrevMonth),
    ("next_month", Action::NextMonth),
    ("toggle_select", Action::ToggleSelect),
    ("select_all", Action::SelectAll),
    ("clear_selection", Action::ClearSelection),
    ("tab_today", Action::SwitchTab(Tab::Today)),
    ("tab_upcoming", Action::SwitchTab(Tab::Upcoming)),
    ("tab_projects", Action::SwitchTab(Tab::Projects)),
    ("tab_labels", Action::SwitchTab(Tab::Labels)),
    ("tab_calendar", Action::SwitchTab(Tab::Calendar)),
    ("next_tab", Action::NextTab),
    ("prev_tab", Action::PrevTab),
    ("open", Action::Open),
    ("add", Action::Add),
    ("edit", Action::Edit),
    ("delete", Action::Delete),
    ("search", Action::Search),
    ("help", Action::Help),
    ("priority_1", Action::SetPriority(1)),
    ("priority_2", Action::SetPriority(2)),
    ("priority_3", Action::SetPriority(3)),
    ("priority_4", Action::SetPriority(4)),
    ("due_today", Action::DueToday),
    ("due_tomorrow", Action::DueTomorrow),
    ("clear_due", Action::ClearDue),
    ("toggle_complete", Action::ToggleComplete),
    ("copy", Action::Copy),
    ("comment", Action::Comment),
    ("toggle_pane", Action::TogglePane),
    ("toggle_panel", Action::TogglePanel),
    ("refresh", Action::Refresh),
    ("undo", Action::Undo),
    ("manage_sections", Action::ManageSections),
    ("add_project", Action::AddProject),
    ("back", Action::Back),
    ("quit", Action::Quit),
];

impl Action {
    pub fn from_name(name: &str) -> Option<Self> {
        NAMED_ACTIONS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, action)| *action)
    }

    pub fn name(self) -> &'static str {
        NAMED_ACTIONS
            .iter()
            .find(|(_, action)| *action == self)
            .map_or("unknown", |(name, _)| name)
    }
}

/// A key plus the modifiers that matter for binding lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyChord {
    fn plain_char(&self) -> Option<char> {
        match (self.code, self.modifiers) {
            (KeyCode::Char(ch), KeyModifiers::NONE) => Some(ch),
            _ => None,
        }
    }

    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        // Shift is already folded into the character for printable keys.
        let modifiers = match code {
            KeyCode::Char(_) | KeyCode::BackTab => modifiers - KeyModifiers::SHIFT,
            _ => modifiers,
        };
        Self { code, modifiers }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self::new(event.code, event.modifiers)
    }

    /// Parses `j`, `G`, `ctrl-d`, `alt-1`, `Enter`, `PageDown`, `S-Tab`, `Space`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidKey(raw.to_string());
        let mut modifiers = KeyModifiers::NONE;
        let mut rest = raw.trim();

        loop {
            let lower = rest.to_ascii_lowercase();
            if let Some(tail) = lower.strip_prefix("ctrl-").or_else(|| lower.strip_prefix("c-")) {
                modifiers |= KeyModifiers::CONTROL;
                rest = &rest[rest.len() - tail.len()..];
            } else if let Some(tail) = lower.strip_prefix("alt-").or_else(|| lower.strip_prefix("m-")) {
                modifiers |= KeyModifiers::ALT;
                rest = &rest[rest.len() - tail.len()..];
            } else if let Some(tail) = lower.strip_prefix("shift-").or_else(|| lower.strip_prefix("s-")) {
                modifiers |= KeyModifiers::SHIFT;
                rest = &rest[rest.len() - tail.len()..];
            } else {
                break;
            }
        }

        let mut chars = rest.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(ch), None) => KeyCode::Char(ch),
            (Some(_), Some(_)) => match rest.to_ascii_lowercase().as_str() {
                "enter" | "return" => KeyCode::Enter,
                "esc" | "escape" => KeyCode::Esc,
                "tab" if modifiers.contains(KeyModifiers::SHIFT) => {
                    modifiers -= KeyModifiers::SHIFT;
                    KeyCode::BackTab
                }
                "tab" => KeyCode::Tab,
                "backtab" => KeyCode::BackTab,
                "space" => KeyCode::Char(' '),
                "backspace" => KeyCode::Backspace,
                "delete" | "del" => KeyCode::Delete,
                "up" => KeyCode::Up,
                "down" => KeyCode::Down,
                "left" => KeyCode::Left,
                "right" => KeyCode::Right,
                "home" => KeyCode::Home,
                "end" => KeyCode::End,
                "pageup" | "pgup" => KeyCode::PageUp,
                "pagedown" | "pgdn" => KeyCode::PageDown,
                other => match other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                    Some(n) if (1..=12).contains(&n) => KeyCode::F(n),
                    _ => return Err(invalid()),
                },
            },
            (None, _) => return Err(invalid()),
        };

        Ok(Self::new(code, modifiers))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl-")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt-")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(ch) => write!(f, "{ch}"),
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Esc => f.write_str("esc"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::BackTab => f.write_str("shift-tab"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Delete => f.write_str("del"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::Home => f.write_str("home"),
            KeyCode::End => f.write_str("end"),
            KeyCode::PageUp => f.write_str("pgup"),
            KeyCode::PageDown => f.write_str("pgdn"),
            KeyCode::F(n) => write!(f, "f{n}"),
            _ => f.write_str("?"),
        }
    }
}

/// Two-key sequences: the starter must be followed by itself.
const SEQUENCES: &[(char, Action)] = &[('g', Action::MoveTop), ('d', Action::Delete)];

fn default_bindings() -> Vec<(KeyChord, Action)> {
    use KeyCode::{
        BackTab, Char, Delete, Down, End, Enter, Esc, Home, Left, PageDown, PageUp, Right, Up,
    };
    let ctrl = |ch| KeyChord::new(Char(ch), KeyModifiers::CONTROL);
    let key = KeyChord::plain;

    vec![
        (key(Char('k')), Action::MoveUp),
        (key(Up), Action::MoveUp),
        (key(Char('j')), Action::MoveDown),
        (key(Down), Action::MoveDown),
        (key(Char('h')), Action::MoveLeft),
        (key(Left), Action::MoveLeft),
        (key(Char('l')), Action::MoveRight),
        (key(Right), Action::MoveRight),
        (key(PageUp), Action::PageUp),
        (ctrl('u'), Action::PageUp),
        (key(PageDown), Action::PageDown),
        (ctrl('d'), Action::PageDown),
        (key(Home), Action::MoveTop),
        (key(Char('G')), Action::MoveBottom),
        (key(End), Action::MoveBottom),
        (key(Char('<')), Action::PrevMonth),
        (key(Char('>')), Action::NextMonth),
        (key(Char(' ')), Action::ToggleSelect),
        (key(Char('V')), Action::SelectAll),
        (key(Char('C')), Action::ClearSelection),
        (key(Char('1')), Action::SwitchTab(Tab::Today)),
        (key(Char('2')), Action::SwitchTab(Tab::Upcoming)),
        (key(Char('3')), Action::SwitchTab(Tab::Projects)),
        (key(Char('4')), Action::SwitchTab(Tab::Labels)),
        (key(Char('5')), Action::SwitchTab(Tab::Calendar)),
        (key(Char(']')), Action::NextTab),
        (key(Char('[')), Action::PrevTab),
        (key(Enter), Action::Open),
        (key(Char('a')), Action::Add),
        (key(Char('e')), Action::Edit),
        (key(Delete), Action::Delete),
        (key(Char('/')), Action::Search),
        (key(Char('?')), Action::Help),
        (key(Char('!')), Action::SetPriority(1)),
        (key(Char('@')), Action::SetPriority(2)),
        (key(Char('#')), Action::SetPriority(3)),
        (key(Char('$')), Action::SetPriority(4)),
        (key(Char('t')), Action::DueToday),
        (key(Char('T')), Action::DueTomorrow),
        (key(Char('N')), Action::ClearDue),
        (key(Char('x')), Action::ToggleComplete),
        (key(Char('y')), Action::Copy),
        (key(Char('c')), Action::Comment),
        (key(KeyCode::Tab), Action::TogglePane),
        (key(BackTab), Action::TogglePane),
        (key(Char('p')), Action::TogglePanel),
        (key(Char('r')), Action::Refresh),
        (ctrl('r'), Action::Refresh),
        (key(Char('u')), Action::Undo),
        (key(Char('S')), Action::ManageSections),
        (key(Char('P')), Action::AddProject),
        (key(Esc), Action::Back),
        (key(Char('q')), Action::Quit),
    ]
}

#[derive(Debug, Clone)]
pub struct KeyMachine {
    bindings: HashMap<KeyChord, Action>,
    pending: Option<char>,
}

impl Default for KeyMachine {
    fn default() -> Self {
        Self {
            bindings: default_bindings().into_iter().collect(),
            pending: None,
        }
    }
}

impl KeyMachine {
    /// Default table with `action = "key"` overrides applied on top.
    ///
    /// An override replaces every default key of that action. Sequence
    /// starters cannot be bound since they never dispatch on their own.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut machine = Self::default();
        for (name, raw_key) in overrides {
            let action =
                Action::from_name(name).ok_or_else(|| ConfigError::UnknownAction(name.clone()))?;
            let chord = KeyChord::parse(raw_key)?;
            if chord.plain_char().and_then(sequence_action).is_some() {
                return Err(ConfigError::InvalidKey(raw_key.clone()));
            }
            machine.bindings.retain(|_, bound| *bound != action);
            machine.bindings.insert(chord, action);
        }
        Ok(machine)
    }

    pub fn pending(&self) -> Option<char> {
        self.pending
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Resolves one key press in normal mode.
    ///
    /// A pending sequence consumes its continuation. Any other key cancels the
    /// sequence and is then resolved on its own, once.
    pub fn dispatch(&mut self, event: &KeyEvent) -> Option<Action> {
        let chord = KeyChord::from_event(event);
        let plain_char = chord.plain_char();

        if let Some(starter) = self.pending.take() {
            if plain_char == Some(starter) {
                return sequence_action(starter);
            }
            tracing::debug!(starter = %starter, key = %chord, "key sequence cancelled");
        }

        if let Some(ch) = plain_char
            && sequence_action(ch).is_some()
        {
            self.pending = Some(ch);
            return None;
        }

        self.bindings.get(&chord).copied()
    }

    /// Binding table for the help overlay, grouped by action.
    pub fn describe(&self) -> Vec<(String, &'static str)> {
        let mut grouped: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for (chord, action) in &self.bindings {
            grouped.entry(action.name()).or_default().push(chord.to_string());
        }
        for (starter, action) in SEQUENCES {
            grouped
                .entry(action.name())
                .or_default()
                .push(format!("{starter}{starter}"));
        }
        let mut rows: Vec<(String, &'static str)> = grouped
            .into_iter()
            .map(|(name, mut keys)| {
                keys.sort();
                (keys.join(" "), name)
            })
            .collect();
        rows.sort_by(|a, b| a.1.cmp(b.1));
        rows
    }
}

fn sequence_action(starter: char) -> Option<Action> {
    SEQUENCES
        .iter()
        .find(|(candidate, _)| *candidate == starter)
        .map(|(_, action)| *action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE)
    }

    #[test]
    fn double_g_goes_to_top() {
        let mut keys = KeyMachine::default();
        assert_eq!(keys.dispatch(&press('g')), None);
        assert_eq!(keys.pending(), Some('g'));
        assert_eq!(keys.dispatch(&press('g')), Some(Action::MoveTop));
        assert_eq!(keys.pending(), None);
    }

    #[test]
    fn broken_sequence_dispatches_follow_up_alone() {
        let mut keys = KeyMachine::default();
        assert_eq!(keys.dispatch(&press('d')), None);
        assert_eq!(keys.dispatch(&press('j')), Some(Action::MoveDown));
        assert_eq!(keys.pending(), None);
        // The cancelled starter does not fire later either.
        assert_eq!(keys.dispatch(&press('k')), Some(Action::MoveUp));
    }

    #[test]
    fn other_starter_restarts_the_sequence() {
        let mut keys = KeyMachine::default();
        keys.dispatch(&press('d'));
        assert_eq!(keys.dispatch(&press('g')), None);
        assert_eq!(keys.dispatch(&press('g')), Some(Action::MoveTop));
    }

    #[test]
    fn shifted_characters_match_plain_bindings() {
        let mut keys = KeyMachine::default();
        let shifted = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(keys.dispatch(&shifted), Some(Action::MoveBottom));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let mut keys = KeyMachine::default();
        assert_eq!(keys.dispatch(&press('Z')), None);
    }

    #[test]
    fn overrides_replace_default_keys() {
        let overrides = BTreeMap::from([(String::from("refresh"), String::from("ctrl-l"))]);
        let mut keys = KeyMachine::with_overrides(&overrides).expect("valid overrides");
        assert_eq!(keys.dispatch(&press('r')), None);
        let ctrl_l = KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL);
        assert_eq!(keys.dispatch(&ctrl_l), Some(Action::Refresh));
    }

    #[test]
    fn bad_overrides_are_reported() {
        let unknown = BTreeMap::from([(String::from("fly"), String::from("f"))]);
        assert!(matches!(
            KeyMachine::with_overrides(&unknown),
            Err(ConfigError::UnknownAction(_))
        ));
        assert!(matches!(KeyChord::parse("ctrl-"), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn digits_switch_tabs_and_tab_key_toggles_pane() {
        let mut keys = KeyMachine::default();
        assert_eq!(
            keys.dispatch(&press('1')),
            Some(Action::SwitchTab(Tab::Today))
        );
        assert_eq!(
            keys.dispatch(&press('5')),
            Some(Action::SwitchTab(Tab::Calendar))
        );
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(keys.dispatch(&tab), Some(Action::TogglePane));
    }

    #[test]
    fn sequence_starters_cannot_be_rebound() {
        let starter = BTreeMap::from([(String::from("refresh"), String::from("g"))]);
        assert!(matches!(
            KeyMachine::with_overrides(&starter),
            Err(ConfigError::InvalidKey(key)) if key == "g"
        ));
        let ctrl_d = BTreeMap::from([(String::from("refresh"), String::from("ctrl-d"))]);
        assert!(KeyMachine::with_overrides(&ctrl_d).is_ok());
    }

    #[test]
    fn chords_parse_named_keys() {
        assert_eq!(
            KeyChord::parse("S-Tab").expect("parse"),
            KeyChord::plain(KeyCode::BackTab)
        );
        assert_eq!(
            KeyChord::parse("PageDown").expect("parse"),
            KeyChord::plain(KeyCode::PageDown)
        );
        assert_eq!(KeyChord::parse("space").expect("parse").to_string(), "space");
    }
}
