//! Text-entry sub-states: the task form, one-line prompts and confirmations.
//!
//! Each of these owns every key while it is active.

use chrono::{Days, NaiveDate, NaiveDateTime};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::FormError;
use crate::model::{Item, ItemPatch, NewItem, Priority};

/// Single-line editable buffer with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map_or(self.value.len(), |(idx, _)| idx)
    }

    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Applies an editing key; returns whether the key was an editing key.
    pub fn edit(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => self.clear(),
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.value.chars().count(),
            KeyCode::Char(ch) if !ctrl => self.insert(ch),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }
}

/// Outcome of a key inside a text-entry sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Editing,
    Submit,
    Cancel,
}

/// Parsed due input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueInput {
    Unchanged,
    Clear,
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Passed through for the service to interpret ("every monday").
    Text(String),
}

impl DueInput {
    fn apply_to_patch(&self, patch: &mut ItemPatch) {
        match self {
            DueInput::Unchanged => {}
            DueInput::Clear => patch.due_string = Some(String::from("no date")),
            DueInput::Date(date) => patch.due_date = Some(date.format("%Y-%m-%d").to_string()),
            DueInput::DateTime(at) => {
                patch.due_datetime = Some(at.format("%Y-%m-%dT%H:%M:%S").to_string());
            }
            DueInput::Text(text) => patch.due_string = Some(text.clone()),
        }
    }

    fn apply_to_new(&self, item: &mut NewItem) {
        match self {
            DueInput::Unchanged | DueInput::Clear => {}
            DueInput::Date(date) => item.due_date = Some(date.format("%Y-%m-%d").to_string()),
            DueInput::DateTime(at) => {
                item.due_datetime = Some(at.format("%Y-%m-%dT%H:%M:%S").to_string());
            }
            DueInput::Text(text) => item.due_string = Some(text.clone()),
        }
    }
}

/// Interprets the due field: keywords, ISO dates, ISO date + time, or free text.
pub fn parse_due(raw: &str, today: NaiveDate) -> Result<DueInput, FormError> {
    let text = raw.trim();
    let lower = text.to_lowercase();
    match lower.as_str() {
        "" => return Ok(DueInput::Unchanged),
        "none" | "no date" | "-" => return Ok(DueInput::Clear),
        "today" | "tod" => return Ok(DueInput::Date(today)),
        "tomorrow" | "tom" => {
            return today
                .checked_add_days(Days::new(1))
                .map(DueInput::Date)
                .ok_or_else(|| FormError::Date(text.to_string()));
        }
        _ => {}
    }

    let looks_numeric = text.chars().next().is_some_and(|ch| ch.is_ascii_digit())
        && text.contains('-');
    if !looks_numeric {
        return Ok(DueInput::Text(text.to_string()));
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(DueInput::Date(date));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(DueInput::DateTime(at));
        }
    }
    Err(FormError::Date(text.to_string()))
}

fn parse_priority(raw: &str) -> Result<Priority, FormError> {
    let trimmed = raw.trim().trim_start_matches(['p', 'P']);
    trimmed
        .parse::<u8>()
        .ok()
        .and_then(Priority::from_display)
        .ok_or_else(|| FormError::Priority(raw.to_string()))
}

fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|label| label.trim().trim_start_matches('@').to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Content,
    Description,
    Due,
    Priority,
    Labels,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Content,
        FormField::Description,
        FormField::Due,
        FormField::Priority,
        FormField::Labels,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FormField::Content => "Content",
            FormField::Description => "Description",
            FormField::Due => "Due",
            FormField::Priority => "Priority (1-4)",
            FormField::Labels => "Labels",
        }
    }

    fn step(self, forward: bool) -> Self {
        let len = Self::ALL.len();
        let at = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { (at + 1) % len } else { (at + len - 1) % len };
        Self::ALL[next]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormTarget {
    Create {
        project_id: Option<String>,
        section_id: Option<String>,
    },
    Edit {
        item_id: String,
    },
}

/// Values an edit form started from, used to send only what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Original {
    content: String,
    description: String,
    priority: Priority,
    labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(NewItem),
    Update { item_id: String, patch: ItemPatch },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub target: FormTarget,
    pub focus: FormField,
    pub content: TextInput,
    pub description: TextInput,
    pub due: TextInput,
    pub priority: TextInput,
    pub labels: TextInput,
    pub error: Option<FormError>,
    original: Original,
}

impl TaskForm {
    pub fn create(
        project_id: Option<String>,
        section_id: Option<String>,
        due: Option<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            target: FormTarget::Create {
                project_id,
                section_id,
            },
            focus: FormField::Content,
            content: TextInput::default(),
            description: TextInput::default(),
            due: TextInput::with_value(due.as_deref().unwrap_or_default()),
            priority: TextInput::with_value("4"),
            labels: TextInput::with_value(&labels.join(", ")),
            error: None,
            original: Original::default(),
        }
    }

    pub fn edit(item: &Item) -> Self {
        // The due field starts empty: leaving it empty keeps the current due.
        Self {
            target: FormTarget::Edit {
                item_id: item.id.clone(),
            },
            focus: FormField::Content,
            content: TextInput::with_value(&item.content),
            description: TextInput::with_value(&item.description),
            due: TextInput::default(),
            priority: TextInput::with_value(&item.priority.display_level().to_string()),
            labels: TextInput::with_value(&item.labels.join(", ")),
            error: None,
            original: Original {
                content: item.content.clone(),
                description: item.description.clone(),
                priority: item.priority,
                labels: item.labels.clone(),
            },
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self.target, FormTarget::Edit { .. })
    }

    pub fn section_id(&self) -> Option<&str> {
        match &self.target {
            FormTarget::Create { section_id, .. } => section_id.as_deref(),
            FormTarget::Edit { .. } => None,
        }
    }

    pub fn field(&self, field: FormField) -> &TextInput {
        match field {
            FormField::Content => &self.content,
            FormField::Description => &self.description,
            FormField::Due => &self.due,
            FormField::Priority => &self.priority,
            FormField::Labels => &self.labels,
        }
    }

    fn field_mut(&mut self, field: FormField) -> &mut TextInput {
        match field {
            FormField::Content => &mut self.content,
            FormField::Description => &mut self.description,
            FormField::Due => &mut self.due,
            FormField::Priority => &mut self.priority,
            FormField::Labels => &mut self.labels,
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Entry {
        match key.code {
            KeyCode::Esc => return Entry::Cancel,
            KeyCode::Enter => return Entry::Submit,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Entry::Submit;
            }
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.step(true),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.step(false),
            _ => {
                let focus = self.focus;
                if self.field_mut(focus).edit(key) {
                    self.error = None;
                }
            }
        }
        Entry::Editing
    }

    /// Validates and turns the form into a request payload.
    pub fn submission(&self, today: NaiveDate) -> Result<Submission, FormError> {
        if self.content.is_blank() {
            return Err(FormError::EmptyContent);
        }
        let due = parse_due(self.due.value(), today)?;
        let priority = parse_priority(self.priority.value())?;
        let labels = parse_labels(self.labels.value());
        let content = self.content.value().trim().to_string();
        let description = self.description.value().trim().to_string();

        match &self.target {
            FormTarget::Create {
                project_id,
                section_id,
            } => {
                let mut item = NewItem {
                    content,
                    description,
                    project_id: project_id.clone(),
                    section_id: section_id.clone(),
                    priority,
                    labels,
                    ..NewItem::default()
                };
                due.apply_to_new(&mut item);
                Ok(Submission::Create(item))
            }
            FormTarget::Edit { item_id } => {
                let mut patch = ItemPatch::default();
                if content != self.original.content {
                    patch.content = Some(content);
                }
                if description != self.original.description {
                    patch.description = Some(description);
                }
                if priority != self.original.priority {
                    patch.priority = Some(priority);
                }
                if labels != self.original.labels {
                    patch.labels = Some(labels);
                }
                due.apply_to_patch(&mut patch);
                Ok(Submission::Update {
                    item_id: item_id.clone(),
                    patch,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    AddProject,
    AddSection { project_id: String },
    RenameSection { section_id: String },
    AddComment { item_id: String },
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::AddProject => "New project",
            PromptKind::AddSection { .. } => "New section",
            PromptKind::RenameSection { .. } => "Rename section",
            PromptKind::AddComment { .. } => "Add comment",
        }
    }

    fn empty_error(&self) -> FormError {
        match self {
            PromptKind::AddComment { .. } => FormError::EmptyComment,
            _ => FormError::EmptyName,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: TextInput,
    pub error: Option<FormError>,
}

impl Prompt {
    pub fn new(kind: PromptKind) -> Self {
        Self::with_value(kind, "")
    }

    pub fn with_value(kind: PromptKind, value: &str) -> Self {
        Self {
            kind,
            input: TextInput::with_value(value),
            error: None,
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Entry {
        match key.code {
            KeyCode::Esc => Entry::Cancel,
            KeyCode::Enter => Entry::Submit,
            _ => {
                if self.input.edit(key) {
                    self.error = None;
                }
                Entry::Editing
            }
        }
    }

    /// Trimmed value, or the validation error for an empty one.
    pub fn value(&self) -> Result<String, FormError> {
        if self.input.is_blank() {
            return Err(self.kind.empty_error());
        }
        Ok(self.input.value().trim().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    DeleteItems { ids: Vec<String>, bulk: bool },
    DeleteProject { id: String, name: String },
    DeleteSection { id: String, name: String },
}

impl Confirm {
    pub fn question(&self) -> String {
        match self {
            Confirm::DeleteItems { ids, .. } if ids.len() == 1 => String::from("Delete this task?"),
            Confirm::DeleteItems { ids, .. } => format!("Delete {} tasks?", ids.len()),
            Confirm::DeleteProject { name, .. } => format!("Delete project {name:?} and its tasks?"),
            Confirm::DeleteSection { name, .. } => format!("Delete section {name:?} and its tasks?"),
        }
    }

    /// `Some(true)` to proceed, `Some(false)` to cancel, `None` to keep waiting.
    pub fn answer(key: &KeyEvent) -> Option<bool> {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => Some(true),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(false),
            _ => None,
        }
    }
}

/// Dialog floating above every view; at most one exists at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Prompt(Prompt),
    Confirm(Confirm),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 28).expect("date")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut TextInput, text: &str) {
        for ch in text.chars() {
            input.edit(&key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::default();
        type_text(&mut input, "héllo");
        input.edit(&key(KeyCode::Left));
        input.edit(&key(KeyCode::Left));
        input.edit(&key(KeyCode::Backspace));
        assert_eq!(input.value(), "hélo");
        input.edit(&key(KeyCode::Home));
        input.edit(&key(KeyCode::Delete));
        assert_eq!(input.value(), "élo");
    }

    #[test]
    fn due_keywords_and_formats() {
        assert_eq!(parse_due("", today()), Ok(DueInput::Unchanged));
        assert_eq!(parse_due("Today", today()), Ok(DueInput::Date(today())));
        assert_eq!(
            parse_due("tom", today()),
            Ok(DueInput::Date(NaiveDate::from_ymd_opt(2024, 2, 29).expect("date")))
        );
        assert!(matches!(
            parse_due("2024-03-01 09:15", today()),
            Ok(DueInput::DateTime(_))
        ));
        assert_eq!(
            parse_due("every monday", today()),
            Ok(DueInput::Text("every monday".into()))
        );
        assert_eq!(
            parse_due("2024-13-40", today()),
            Err(FormError::Date("2024-13-40".into()))
        );
    }

    #[test]
    fn empty_content_blocks_submission() {
        let form = TaskForm::create(None, None, None, Vec::new());
        assert_eq!(form.submission(today()), Err(FormError::EmptyContent));
    }

    #[test]
    fn create_form_builds_new_item() {
        let mut form = TaskForm::create(
            Some("p1".into()),
            Some("s1".into()),
            Some("today".into()),
            vec!["home".into()],
        );
        type_text(&mut form.content, "Water plants");
        form.priority = TextInput::with_value("1");

        let Ok(Submission::Create(item)) = form.submission(today()) else {
            panic!("expected create");
        };
        assert_eq!(item.content, "Water plants");
        assert_eq!(item.section_id.as_deref(), Some("s1"));
        assert_eq!(item.due_date.as_deref(), Some("2024-02-28"));
        assert_eq!(item.priority, Priority::HIGHEST);
        assert_eq!(item.labels, ["home"]);
    }

    #[test]
    fn edit_form_sends_only_changes() {
        let item = Item {
            id: "i1".into(),
            content: "Call mum".into(),
            priority: Priority::from_raw(2),
            labels: vec!["phone".into()],
            ..Item::default()
        };
        let mut form = TaskForm::edit(&item);
        assert_eq!(form.priority.value(), "3");
        form.handle_key(&key(KeyCode::Tab));
        form.handle_key(&key(KeyCode::Tab));
        assert_eq!(form.focus, FormField::Due);
        type_text(&mut form.due, "none");

        let Ok(Submission::Update { item_id, patch }) = form.submission(today()) else {
            panic!("expected update");
        };
        assert_eq!(item_id, "i1");
        assert_eq!(
            patch,
            ItemPatch {
                due_string: Some("no date".into()),
                ..ItemPatch::default()
            }
        );
    }

    #[test]
    fn bad_priority_is_reported() {
        let mut form = TaskForm::create(None, None, None, Vec::new());
        type_text(&mut form.content, "x");
        form.priority = TextInput::with_value("9");
        assert_eq!(form.submission(today()), Err(FormError::Priority("9".into())));
    }

    #[test]
    fn prompt_rejects_blank_values() {
        let mut prompt = Prompt::new(PromptKind::AddComment {
            item_id: "i".into(),
        });
        assert_eq!(prompt.value(), Err(FormError::EmptyComment));
        prompt.handle_key(&key(KeyCode::Char('o')));
        prompt.handle_key(&key(KeyCode::Char('k')));
        assert_eq!(prompt.value(), Ok("ok".into()));
        assert_eq!(prompt.handle_key(&key(KeyCode::Enter)), Entry::Submit);
    }

    #[test]
    fn confirm_answers() {
        assert_eq!(Confirm::answer(&key(KeyCode::Char('y'))), Some(true));
        assert_eq!(Confirm::answer(&key(KeyCode::Esc)), Some(false));
        assert_eq!(Confirm::answer(&key(KeyCode::Char('j'))), None);
    }
}
