use std::io::stdout;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedSender;
use tui_widgets::popup::PopupState;
use uuid::Uuid;

use crate::config::{Config, UiColors};
use crate::contact::{Contact, Store};
use crate::directory::{AddContactRequest, DirectoryError, UpdateBatch};

use super::draw;
use super::form::EditContactForm;

/// How long a confirmation notice stays on screen.
const NOTICE_TTL: Duration = Duration::from_secs(3);

/// A submit handed off to the transport task.
#[derive(Debug)]
pub struct Submission {
    pub seq: u64,
    pub contact_id: Uuid,
    pub was_contact: bool,
    pub request: AddContactRequest,
}

/// Completion of a submit, delivered back to the UI thread.
#[derive(Debug)]
pub struct FormOutcome {
    pub seq: u64,
    pub contact_id: Uuid,
    pub was_contact: bool,
    pub first_name: String,
    pub last_name: String,
    pub result: Result<UpdateBatch, DirectoryError>,
}

/// Transient confirmation overlay.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    expires_at: Instant,
}

impl Notice {
    fn new(message: String) -> Self {
        Self {
            message,
            expires_at: Instant::now() + NOTICE_TTL,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub struct App<'a> {
    store: &'a mut Store,
    config: &'a Config,
    submissions: UnboundedSender<Submission>,
    outcomes: Receiver<FormOutcome>,
    pub selected: usize,
    pub status: Option<String>,
    pub notice: Option<Notice>,
    pub form: Option<EditContactForm>,
    // Popup state for the form dialog (tui-widgets popup)
    pub modal_popup: PopupState,
    next_seq: u64,
}

impl<'a> App<'a> {
    pub fn new(
        store: &'a mut Store,
        config: &'a Config,
        submissions: UnboundedSender<Submission>,
        outcomes: Receiver<FormOutcome>,
    ) -> Self {
        Self {
            store,
            config,
            submissions,
            outcomes,
            selected: 0,
            status: None,
            notice: None,
            form: None,
            modal_popup: PopupState::default(),
            next_seq: 0,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            // Completions resume here, on the UI thread.
            while let Ok(outcome) = self.outcomes.try_recv() {
                self.handle_outcome(outcome);
            }

            if self.notice.as_ref().is_some_and(Notice::is_expired) {
                self.notice = None;
            }

            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        // The form captures all input while open
        if self.form.is_some() {
            self.handle_form_key(key);
            return Ok(false);
        }

        let global = &self.config.keys.global;
        let list = &self.config.keys.list;

        if self.key_matches_any(&key, &global.quit) {
            return Ok(true);
        }

        if self.key_matches_any(&key, &list.next) {
            self.move_selection(1);
            return Ok(false);
        }
        if self.key_matches_any(&key, &list.prev) {
            self.move_selection(-1);
            return Ok(false);
        }

        if self.key_matches_any(&key, &list.edit) {
            self.open_edit_form();
            return Ok(false);
        }

        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let form_keys = &self.config.keys.form;

        // Cancel: close without saving. A pending request, if any, will
        // still update the store when it completes.
        if self.key_matches_any(&key, &form_keys.cancel) {
            self.form = None;
            return;
        }

        if self.key_matches_any(&key, &form_keys.confirm) {
            let Some(form) = self.form.as_mut() else {
                return;
            };
            // Enter advances through empty fields before it saves.
            if !form.field_submit() {
                return;
            }
            if let Some((first, last)) = form.try_submit() {
                self.submit_form(first, last);
            }
            return;
        }

        // Save directly, skipping the focus-advance behavior of Enter.
        // An empty form is rejected here with a field-level error.
        if self.key_matches_any(&key, &form_keys.save) {
            if let Some(form) = self.form.as_mut() {
                if let Some((first, last)) = form.try_submit() {
                    self.submit_form(first, last);
                }
            }
            return;
        }

        if self.key_matches_any(&key, &form_keys.next) {
            if let Some(form) = self.form.as_mut() {
                form.focus_next();
            }
            return;
        }
        if self.key_matches_any(&key, &form_keys.prev) {
            if let Some(form) = self.form.as_mut() {
                form.focus_prev();
            }
            return;
        }

        // Toggle only acts on a focused checkbox; otherwise the key (Space)
        // belongs to the name being typed.
        if self.key_matches_any(&key, &form_keys.toggle) {
            if let Some(form) = self.form.as_mut() {
                if form.toggle_share() {
                    return;
                }
            }
        }

        if let Some(form) = self.form.as_mut() {
            form.handle_input_key(key);
        }
    }

    fn open_edit_form(&mut self) {
        let Some(contact) = self.store.contacts().get(self.selected).cloned() else {
            self.set_status("No contact selected");
            return;
        };
        self.next_seq += 1;
        self.modal_popup = PopupState::default();
        self.form = Some(EditContactForm::new(
            &contact,
            self.store,
            self.config.name_order,
            self.next_seq,
        ));
    }

    /// Send the validated form values as one request. The form stays open
    /// and editable until the success completion closes it.
    fn submit_form(&mut self, first: String, last: String) {
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let contact_id = form.contact_id();
        let was_contact = self
            .store
            .get(&contact_id)
            .map(|c| c.is_contact)
            .unwrap_or(false);
        let submission = Submission {
            seq: form.seq(),
            contact_id,
            was_contact,
            request: form.build_request(first, last),
        };
        tracing::debug!(contact = %contact_id, "submitting contact update");
        if self.submissions.send(submission).is_err() {
            self.set_status("Directory task is gone");
        }
    }

    /// Apply a completed submit. Store mutations always apply; the form is
    /// only closed when it is still the instance that sent the request.
    pub fn handle_outcome(&mut self, outcome: FormOutcome) {
        match outcome.result {
            Ok(batch) => {
                self.store
                    .set_name(&outcome.contact_id, &outcome.first_name, &outcome.last_name);
                self.store.apply(&batch);
                self.store.clear_suggestions(&outcome.contact_id);

                if self.form.as_ref().map(EditContactForm::seq) == Some(outcome.seq) {
                    self.form = None;
                }

                if !outcome.was_contact {
                    self.show_notice(format!("{} is now in your contacts", outcome.first_name));
                }
            }
            Err(error) => {
                // The form stays open; retrying is up to the user.
                tracing::warn!(%error, contact = %outcome.contact_id, "add contact request failed");
                self.set_status("Could not save contact");
            }
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let current = self.selected as i64;
        self.selected = (current + delta).clamp(0, len as i64 - 1) as usize;
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status = Some(message.into());
    }

    fn show_notice(&mut self, message: String) {
        self.notice = Some(Notice::new(message));
    }

    pub fn contacts(&self) -> &[Contact] {
        self.store.contacts()
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn phone_region(&self) -> Option<&str> {
        self.config.phone_region.as_deref()
    }

    pub fn server_label(&self) -> &str {
        &self.config.server.base_url
    }

    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }
}

fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Disallow Ctrl/Alt/Super modifiers (we don't support them)
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        "f1" => matches!(event.code, KeyCode::F(1)),
        "f2" => matches!(event.code, KeyCode::F(2)),
        "f3" => matches!(event.code, KeyCode::F(3)),
        "f4" => matches!(event.code, KeyCode::F(4)),
        "f5" => matches!(event.code, KeyCode::F(5)),
        "f6" => matches!(event.code, KeyCode::F(6)),
        "f7" => matches!(event.code, KeyCode::F(7)),
        "f8" => matches!(event.code, KeyCode::F(8)),
        "f9" => matches!(event.code, KeyCode::F(9)),
        "f10" => matches!(event.code, KeyCode::F(10)),
        "f11" => matches!(event.code, KeyCode::F(11)),
        "f12" => matches!(event.code, KeyCode::F(12)),
        // Single character - case-sensitive (m != M, since M requires Shift)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}
