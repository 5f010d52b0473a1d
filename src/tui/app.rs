use crate::{
    error::{Error, Result},
    reclamation::{
        FormRecord, ListObserver, ListParams, ListQuery, NewReclamation, Reclamation, ReclamationApi,
        ReclamationService, RecordQuery, RemoveTarget,
    },
    tui::{
        components::pagination::Pagination,
        list_state::ListState,
        location::{History, Location},
    },
};
use chrono::{DateTime, Local};
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use futures::future::{BoxFuture, FutureExt};
use tui_input::{backend::crossterm::EventHandler, Input};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Bounded activity log shown in the TUI.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        });
        if self.entries.len() > MAX_LOG_ENTRIES {
            self.entries.remove(0);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Link,
    Description,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Name, FormField::Link, FormField::Description];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Link => "Link",
            FormField::Description => "Description",
        }
    }

    fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Link,
            FormField::Link => FormField::Description,
            FormField::Description => FormField::Name,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::Name => FormField::Description,
            FormField::Link => FormField::Name,
            FormField::Description => FormField::Link,
        }
    }
}

/// Create/edit form. An edit form holds the record loaded for it, which
/// keeps that cache entry alive until the form closes.
pub struct FormState {
    pub editing: Option<FormRecord>,
    pub name: Input,
    pub link: Input,
    pub description: Input,
    pub focus: FormField,
    pub error: Option<String>,
}

impl FormState {
    pub fn create() -> Self {
        Self {
            editing: None,
            name: Input::default(),
            link: Input::default(),
            description: Input::default(),
            focus: FormField::Name,
            error: None,
        }
    }

    pub fn edit(record: FormRecord) -> Self {
        Self {
            name: Input::default().with_value(record.name.clone()),
            link: Input::default().with_value(record.link.clone()),
            description: Input::default().with_value(record.description.clone().unwrap_or_default()),
            editing: Some(record),
            focus: FormField::Name,
            error: None,
        }
    }

    pub fn title(&self) -> String {
        match &self.editing {
            Some(record) => format!("Edit reclamation #{}", record.id),
            None => "New reclamation".to_string(),
        }
    }

    pub fn input(&self, field: FormField) -> &Input {
        match field {
            FormField::Name => &self.name,
            FormField::Link => &self.link,
            FormField::Description => &self.description,
        }
    }

    fn input_mut(&mut self, field: FormField) -> &mut Input {
        match field {
            FormField::Name => &mut self.name,
            FormField::Link => &mut self.link,
            FormField::Description => &mut self.description,
        }
    }

    /// Trimmed field values; name and link are required.
    fn values(&self) -> std::result::Result<(String, String, Option<String>), String> {
        let name = self.name.value().trim().to_string();
        let link = self.link.value().trim().to_string();
        let description = self.description.value().trim().to_string();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if link.is_empty() {
            return Err("Link is required".to_string());
        }
        Ok((name, link, (!description.is_empty()).then_some(description)))
    }
}

pub enum Mode {
    List,
    Detail { id: i64 },
    Form(FormState),
    ConfirmDelete(RemoveTarget),
}

/// Work that needs the network; it runs as a task next to the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Retry,
    OpenEdit(i64),
    Submit,
    Delete,
}

/// Result of a finished [`Action`].
pub enum Outcome {
    Reloaded(Result<()>),
    EditLoaded {
        id: i64,
        result: Result<Option<FormRecord>>,
    },
    Saved {
        created: bool,
        result: Result<Reclamation>,
    },
    Removed {
        target: RemoveTarget,
        result: Result<()>,
    },
}

/// Inline text for a failed mutation.
pub fn mutation_message(err: &Error) -> String {
    if err.is_name_already_used() {
        "Name already used".to_string()
    } else {
        err.to_string()
    }
}

pub struct App<A> {
    // UI State
    pub should_quit: bool,
    pub history: History,
    pub page_size: u32,
    pub selected_index: usize,
    pub mode: Mode,
    pub status_message: String,
    pub activity: ActivityLog,
    pub api_url: String,
    /// An action task is in flight.
    pub busy: bool,

    // Data
    pub list: ListQuery,
    pub detail: RecordQuery,

    // Backend
    service: ReclamationService<A>,
    observer: ListObserver<A>,
}

impl<A: ReclamationApi> App<A> {
    pub fn new(service: ReclamationService<A>, page_size: u32, location: Location, api_url: String) -> Self {
        let observer = service.list_observer();
        let history = History::new(location);
        let params = ListParams::new(zero_based(history.current().page()), page_size);

        Self {
            should_quit: false,
            history,
            page_size,
            selected_index: 0,
            mode: Mode::List,
            status_message: "Ready".to_string(),
            activity: ActivityLog::default(),
            api_url,
            busy: false,
            list: ListQuery {
                params,
                data: None,
                error: None,
                is_fetching: false,
                is_previous_data: false,
            },
            detail: RecordQuery::disabled(),
            service,
            observer,
        }
    }

    /// One-based page owned by the current location.
    pub fn page(&self) -> u64 {
        self.history.current().page()
    }

    pub fn params(&self) -> ListParams {
        ListParams::new(zero_based(self.page()), self.page_size)
    }

    pub fn list_state(&self) -> ListState<'_> {
        ListState::from_query(&self.list)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page(), &self.list)
    }

    pub fn selected(&self) -> Option<&Reclamation> {
        self.list_state().rows().get(self.selected_index)
    }

    /// Re-read the cache for what is on screen.
    pub fn refresh(&mut self) {
        self.list = self.observer.observe(self.params());

        let rows = self.list_state().rows().len();
        if rows == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= rows {
            self.selected_index = rows - 1;
        }

        if let Mode::Detail { id } = self.mode {
            self.detail = self.service.record_snapshot(Some(id));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        match self.mode {
            Mode::List => self.handle_list_key(key),
            Mode::Detail { id } => self.handle_detail_key(key, id),
            Mode::Form(_) => self.handle_form_key(key),
            Mode::ConfirmDelete(_) => self.handle_confirm_key(key),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.next_item(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_item(),
            KeyCode::Right | KeyCode::Char('n') => self.next_page(),
            KeyCode::Left | KeyCode::Char('p') => self.previous_page(),
            KeyCode::Home | KeyCode::Char('g') => self.first_page(),
            KeyCode::End | KeyCode::Char('G') => self.last_page(),
            KeyCode::Char('[') => self.go_back(),
            KeyCode::Char(']') => self.go_forward(),
            KeyCode::Char('r') => return Some(Action::Retry),
            KeyCode::Char('a') => self.mode = Mode::Form(FormState::create()),
            KeyCode::Enter => {
                if let Some(id) = self.selected().map(|r| r.id) {
                    self.mode = Mode::Detail { id };
                    self.refresh();
                }
            }
            KeyCode::Char('e') => return self.selected().map(|r| Action::OpenEdit(r.id)),
            KeyCode::Char('d') => {
                if let Some(target) = self.selected().map(RemoveTarget::from) {
                    self.mode = Mode::ConfirmDelete(target);
                }
            }
            _ => {}
        }
        None
    }

    fn handle_detail_key(&mut self, key: KeyEvent, id: i64) -> Option<Action> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => {
                self.mode = Mode::List;
                self.detail = RecordQuery::disabled();
                None
            }
            KeyCode::Char('e') => Some(Action::OpenEdit(id)),
            KeyCode::Char('r') => Some(Action::Retry),
            _ => None,
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<Action> {
        let Mode::Form(form) = &mut self.mode else {
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::List;
                self.status_message = "Cancelled".to_string();
            }
            KeyCode::Enter => return Some(Action::Submit),
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.previous(),
            _ => {
                let focus = form.focus;
                form.input_mut(focus).handle_event(&CrosstermEvent::Key(key));
            }
        }
        None
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(Action::Delete),
            KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
                self.mode = Mode::List;
                None
            }
            _ => None,
        }
    }

    // Navigation

    pub fn next_item(&mut self) {
        let len = self.list_state().rows().len();
        if len > 0 {
            self.selected_index = (self.selected_index + 1) % len;
        }
    }

    pub fn previous_item(&mut self) {
        let len = self.list_state().rows().len();
        if len > 0 {
            if self.selected_index == 0 {
                self.selected_index = len - 1;
            } else {
                self.selected_index -= 1;
            }
        }
    }

    pub fn next_page(&mut self) {
        let pagination = self.pagination();
        if pagination.can_go_next() {
            self.navigate(pagination.page + 1);
        } else {
            self.page_blocked(&pagination);
        }
    }

    pub fn previous_page(&mut self) {
        let pagination = self.pagination();
        if pagination.can_go_prev() {
            self.navigate(pagination.page - 1);
        } else {
            self.page_blocked(&pagination);
        }
    }

    pub fn first_page(&mut self) {
        let pagination = self.pagination();
        if pagination.can_go_prev() {
            self.navigate(pagination.first_page());
        } else {
            self.page_blocked(&pagination);
        }
    }

    pub fn last_page(&mut self) {
        let pagination = self.pagination();
        if pagination.can_go_next() {
            self.navigate(pagination.last_page());
        } else {
            self.page_blocked(&pagination);
        }
    }

    fn page_blocked(&mut self, pagination: &Pagination) {
        if pagination.is_loading_page {
            self.status_message = "Page is still loading".to_string();
        }
    }

    fn navigate(&mut self, page: u64) {
        let next = self.history.current().with_page(page);
        self.history.push(next);
        self.selected_index = 0;
        self.refresh();
    }

    pub fn go_back(&mut self) {
        if self.history.back() {
            self.selected_index = 0;
            self.refresh();
        }
    }

    pub fn go_forward(&mut self) {
        if self.history.forward() {
            self.selected_index = 0;
            self.refresh();
        }
    }

    // Actions

    /// Prepare `action` and hand back the network part as a task. The caller
    /// spawns it and passes the outcome to [`App::finish`]; the UI keeps
    /// drawing in between. Returns `None` when there is nothing to run.
    pub fn start(&mut self, action: Action) -> Option<BoxFuture<'static, Outcome>> {
        if self.busy {
            self.status_message = "Still working…".to_string();
            return None;
        }
        let service = self.service.clone();

        let task = match action {
            Action::Retry => {
                self.status_message = "Reloading…".to_string();
                match self.mode {
                    Mode::Detail { id } => {
                        async move { Outcome::Reloaded(service.refetch_record(id).await.map(|_| ())) }.boxed()
                    }
                    _ => {
                        let params = self.params();
                        async move { Outcome::Reloaded(service.refetch_list(params).await.map(|_| ())) }.boxed()
                    }
                }
            }
            Action::OpenEdit(id) => {
                self.status_message = format!("Loading #{}…", id);
                async move {
                    Outcome::EditLoaded {
                        id,
                        result: service.get_for_form(Some(id)).await,
                    }
                }
                .boxed()
            }
            Action::Submit => {
                let Mode::Form(form) = &mut self.mode else {
                    return None;
                };
                let (name, link, description) = match form.values() {
                    Ok(values) => values,
                    Err(message) => {
                        form.error = Some(message);
                        return None;
                    }
                };
                form.error = None;
                self.status_message = "Saving…".to_string();

                match form.editing.as_ref().map(|r| r.id) {
                    Some(id) => {
                        let record = Reclamation {
                            id,
                            name,
                            link,
                            description,
                        };
                        async move {
                            Outcome::Saved {
                                created: false,
                                result: service.update(record).await,
                            }
                        }
                        .boxed()
                    }
                    None => {
                        let payload = NewReclamation {
                            name,
                            link,
                            description,
                        };
                        async move {
                            Outcome::Saved {
                                created: true,
                                result: service.create(payload).await,
                            }
                        }
                        .boxed()
                    }
                }
            }
            Action::Delete => {
                let Mode::ConfirmDelete(target) = &self.mode else {
                    return None;
                };
                let target = target.clone();
                self.status_message = format!("Deleting \"{}\"…", target.name);
                async move {
                    let result = service.remove(target.clone()).await;
                    Outcome::Removed { target, result }
                }
                .boxed()
            }
        };

        self.busy = true;
        Some(task)
    }

    /// Apply the result of a task returned by [`App::start`].
    pub fn finish(&mut self, outcome: Outcome) {
        self.busy = false;
        match outcome {
            Outcome::Reloaded(Ok(())) => {
                self.status_message = "Reloaded".to_string();
                self.activity.push(LogLevel::Info, format!("Reloaded {}", self.history.current()));
            }
            Outcome::Reloaded(Err(e)) => {
                self.status_message = format!("Reload failed: {}", e);
                self.activity.push(LogLevel::Error, self.status_message.clone());
            }
            Outcome::EditLoaded { id, result } => match result {
                Ok(Some(record)) => {
                    self.mode = Mode::Form(FormState::edit(record));
                    self.status_message = format!("Editing #{}", id);
                }
                Ok(None) => {}
                Err(e) => {
                    self.status_message = format!("Could not load #{}: {}", id, e);
                    self.activity.push(LogLevel::Error, self.status_message.clone());
                }
            },
            Outcome::Saved { created, result } => match result {
                Ok(record) => {
                    if created {
                        self.activity
                            .push(LogLevel::Success, format!("Created \"{}\" (#{})", record.name, record.id));
                        // Newest records come first.
                        self.history.push(Location::list(1));
                        self.status_message = format!("Reclamation \"{}\" created", record.name);
                    } else {
                        self.activity.push(LogLevel::Success, format!("Updated \"{}\"", record.name));
                        self.status_message = format!("Reclamation \"{}\" updated", record.name);
                    }
                    self.mode = Mode::List;
                    self.selected_index = 0;
                }
                Err(e) => {
                    let message = mutation_message(&e);
                    self.activity.push(LogLevel::Warning, format!("Save failed: {}", message));
                    match &mut self.mode {
                        Mode::Form(form) => {
                            form.error = Some(message);
                            self.status_message = "Not saved".to_string();
                        }
                        _ => self.status_message = format!("Save failed: {}", message),
                    }
                }
            },
            Outcome::Removed { target, result } => {
                if matches!(self.mode, Mode::ConfirmDelete(_)) {
                    self.mode = Mode::List;
                }
                match result {
                    Ok(()) => {
                        self.activity.push(LogLevel::Success, format!("Removed \"{}\"", target.name));
                        self.status_message = format!("Reclamation \"{}\" removed", target.name);
                        self.selected_index = 0;
                    }
                    Err(e) => {
                        self.status_message =
                            format!("Could not remove \"{}\": {}", target.name, mutation_message(&e));
                        self.activity.push(LogLevel::Error, self.status_message.clone());
                    }
                }
            }
        }
        self.refresh();
    }
}

fn zero_based(page: u64) -> u32 {
    u32::try_from(page.saturating_sub(1)).unwrap_or(u32::MAX)
}
