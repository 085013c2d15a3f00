//! Query editor: four focus-cycled fields plus the assisted generation prompt.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::store::SavedQuery;

pub const NAME_LIMIT: usize = 50;
pub const DESCRIPTION_LIMIT: usize = 100;
pub const ORDER_LIMIT: usize = 10;

/// Editable text with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    /// Cursor position in characters, `0..=len`.
    pub cursor: usize,
    limit: Option<usize>,
    multiline: bool,
}

impl TextInput {
    pub fn single_line(value: &str, limit: usize) -> Self {
        let value: String = value.chars().take(limit).collect();
        Self {
            cursor: value.chars().count(),
            value,
            limit: Some(limit),
            multiline: false,
        }
    }

    pub fn multi_line(value: &str) -> Self {
        Self {
            cursor: value.chars().count(),
            value: value.to_string(),
            limit: None,
            multiline: true,
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map_or(self.value.len(), |(i, _)| i)
    }

    pub fn set(&mut self, value: &str) {
        self.value = match self.limit {
            Some(limit) => value.chars().take(limit).collect(),
            None => value.to_string(),
        };
        self.cursor = self.len();
    }

    pub fn insert(&mut self, c: char) {
        if c == '\n' && !self.multiline {
            return;
        }
        if self.limit.is_some_and(|limit| self.len() >= limit) {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    /// Start of the current line (or of the whole text when single-line).
    pub fn move_home(&mut self) {
        let (_, col) = self.cursor_line_col();
        self.cursor -= col;
    }

    pub fn move_end(&mut self) {
        let rest = self.value.chars().skip(self.cursor);
        self.cursor += rest.take_while(|&c| c != '\n').count();
    }

    fn line_starts(&self) -> Vec<usize> {
        let mut starts = vec![0];
        for (i, c) in self.value.chars().enumerate() {
            if c == '\n' {
                starts.push(i + 1);
            }
        }
        starts
    }

    /// Zero-based line and column of the cursor.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let starts = self.line_starts();
        let line = starts.iter().rposition(|&s| s <= self.cursor).unwrap_or(0);
        (line, self.cursor - starts[line])
    }

    fn move_vertical(&mut self, down: bool) {
        let starts = self.line_starts();
        let (line, col) = self.cursor_line_col();
        let target = if down {
            if line + 1 >= starts.len() {
                return;
            }
            line + 1
        } else {
            if line == 0 {
                return;
            }
            line - 1
        };
        let line_end = starts
            .get(target + 1)
            .map_or(self.len(), |next| next - 1);
        self.cursor = (starts[target] + col).min(line_end);
    }

    pub fn move_up(&mut self) {
        self.move_vertical(false);
    }

    pub fn move_down(&mut self) {
        self.move_vertical(true);
    }

    /// Shared cursor and text keys. Returns false when the key is not an edit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return false;
        }
        match key.code {
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            KeyCode::Up if self.multiline => self.move_up(),
            KeyCode::Down if self.multiline => self.move_down(),
            KeyCode::Enter if self.multiline => self.insert('\n'),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Name,
    Description,
    Order,
    Sql,
}

impl EditorField {
    pub const ALL: [Self; 4] = [Self::Name, Self::Description, Self::Order, Self::Sql];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Description => "Description",
            Self::Order => "Order",
            Self::Sql => "SQL",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Name => Self::Description,
            Self::Description => Self::Order,
            Self::Order => Self::Sql,
            Self::Sql => Self::Name,
        }
    }

    pub const fn prev(self) -> Self {
        match self {
            Self::Name => Self::Sql,
            Self::Description => Self::Name,
            Self::Order => Self::Description,
            Self::Sql => Self::Order,
        }
    }
}

/// Parsed content of the order field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderInput {
    Empty,
    Value(i64),
    Invalid,
}

pub fn parse_order(text: &str) -> OrderInput {
    let text = text.trim();
    if text.is_empty() {
        return OrderInput::Empty;
    }
    text.parse().map_or(OrderInput::Invalid, OrderInput::Value)
}

/// Nested natural-language prompt inside the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistState {
    pub prompt: TextInput,
    /// Id of the outstanding request; completions for other ids are stale.
    pub request: u64,
    pub in_flight: bool,
    pub response: Option<String>,
}

impl AssistState {
    pub fn new() -> Self {
        Self {
            prompt: TextInput::single_line("", 500),
            ..Self::default()
        }
    }

    /// Prompt edits are refused while a request or a response is pending.
    pub const fn is_locked(&self) -> bool {
        self.in_flight || self.response.is_some()
    }
}

/// What the session should do after the editor consumed a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    Continue,
    Save,
    Delete,
    Cancel,
    Generate {
        prompt: String,
        current_sql: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    /// Name of the record being edited; `None` for a new query.
    pub original_name: Option<String>,
    /// Stored order of the record, before any temporary assignment.
    pub original_order: Option<i64>,
    /// Order shown when the editor opened, temporary assignments included.
    pub shown_order: Option<i64>,
    pub name: TextInput,
    pub description: TextInput,
    pub order: TextInput,
    pub sql: TextInput,
    pub focus: EditorField,
    pub assist: Option<AssistState>,
}

impl EditorState {
    pub fn new_query() -> Self {
        Self {
            original_name: None,
            original_order: None,
            shown_order: None,
            name: TextInput::single_line("", NAME_LIMIT),
            description: TextInput::single_line("", DESCRIPTION_LIMIT),
            order: TextInput::single_line("", ORDER_LIMIT),
            sql: TextInput::multi_line(""),
            focus: EditorField::Name,
            assist: None,
        }
    }

    /// Open `query` for editing, showing `shown_order` in the order field.
    pub fn edit(query: &SavedQuery, shown_order: Option<i64>) -> Self {
        let order_text = shown_order.map(|o| o.to_string()).unwrap_or_default();
        Self {
            original_name: Some(query.name.clone()),
            original_order: query.order_position,
            shown_order,
            name: TextInput::single_line(&query.name, NAME_LIMIT),
            description: TextInput::single_line(&query.description, DESCRIPTION_LIMIT),
            order: TextInput::single_line(&order_text, ORDER_LIMIT),
            sql: TextInput::multi_line(&query.sql),
            focus: EditorField::Name,
            assist: None,
        }
    }

    pub const fn is_new(&self) -> bool {
        self.original_name.is_none()
    }

    pub fn field(&self, field: EditorField) -> &TextInput {
        match field {
            EditorField::Name => &self.name,
            EditorField::Description => &self.description,
            EditorField::Order => &self.order,
            EditorField::Sql => &self.sql,
        }
    }

    fn focused_mut(&mut self) -> &mut TextInput {
        match self.focus {
            EditorField::Name => &mut self.name,
            EditorField::Description => &mut self.description,
            EditorField::Order => &mut self.order,
            EditorField::Sql => &mut self.sql,
        }
    }

    /// Order to persist. A value equal to the temporary order the editor
    /// opened with counts as untouched; unparseable text keeps the stored order.
    pub fn resolved_order(&self) -> Option<i64> {
        match parse_order(&self.order.value) {
            OrderInput::Empty => None,
            OrderInput::Invalid => self.original_order,
            OrderInput::Value(v) => {
                let temporary = self.shown_order.filter(|&o| self.original_order != Some(o));
                if temporary == Some(v) {
                    None
                } else {
                    Some(v)
                }
            }
        }
    }

    pub fn to_query(&self) -> SavedQuery {
        SavedQuery::new(
            self.name.value.trim(),
            self.description.value.trim(),
            &self.sql.value,
            self.resolved_order(),
        )
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorOutcome {
        if self.assist.is_some() {
            return self.handle_assist_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return EditorOutcome::Save,
            KeyCode::Char('d') if ctrl => return EditorOutcome::Delete,
            KeyCode::Char('c') if ctrl => return EditorOutcome::Cancel,
            KeyCode::Char('g') if ctrl => self.assist = Some(AssistState::new()),
            KeyCode::Esc => return EditorOutcome::Cancel,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Enter if self.focus != EditorField::Sql => self.focus = self.focus.next(),
            _ => {
                self.focused_mut().handle_key(key);
            }
        }
        EditorOutcome::Continue
    }

    fn handle_assist_key(&mut self, key: KeyEvent) -> EditorOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            self.assist = None;
            return EditorOutcome::Continue;
        }
        let Some(assist) = self.assist.as_mut() else {
            return EditorOutcome::Continue;
        };

        if let Some(response) = &assist.response {
            if matches!(key.code, KeyCode::Char('c' | 'y') | KeyCode::Enter) && !ctrl {
                let sql = response.clone();
                self.sql.set(&sql);
                self.focus = EditorField::Sql;
                self.assist = None;
            }
            return EditorOutcome::Continue;
        }
        if assist.in_flight {
            return EditorOutcome::Continue;
        }

        if key.code == KeyCode::Enter {
            let prompt = assist.prompt.value.trim().to_string();
            if prompt.is_empty() {
                return EditorOutcome::Continue;
            }
            assist.in_flight = true;
            let current_sql = Some(self.sql.value.clone()).filter(|s| !s.trim().is_empty());
            return EditorOutcome::Generate {
                prompt,
                current_sql,
            };
        }
        assist.prompt.handle_key(key);
        EditorOutcome::Continue
    }
}
