//! The contact edit form: two name fields, an optional phone-sharing
//! checkbox, and the validation and focus rules around them.

use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use uuid::Uuid;

use crate::contact::{normalize_name, Contact, NameOrder, Store};
use crate::directory::AddContactRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    First,
    Last,
}

/// Visual order of the name fields for a given name-order rule.
/// All focus, tab and submit logic derives from this list.
pub fn field_order(order: NameOrder) -> [FieldRole; 2] {
    if order.inverted() {
        [FieldRole::Last, FieldRole::First]
    } else {
        [FieldRole::First, FieldRole::Last]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Field(FieldRole),
    SharePhone,
}

pub struct EditContactForm {
    contact_id: Uuid,
    /// Serial of this form instance. Completions carrying a different serial
    /// must not touch the form.
    seq: u64,
    title: &'static str,
    first: Input,
    last: Input,
    /// Resolved once at construction; immutable for the form's lifetime.
    phone: String,
    order: [FieldRole; 2],
    focus: Focus,
    /// `None` when the checkbox is absent.
    share_phone: Option<bool>,
    warning: Option<String>,
    share_note: Option<String>,
    error: Option<FieldRole>,
}

impl EditContactForm {
    pub fn new(contact: &Contact, store: &Store, order: NameOrder, seq: u64) -> Self {
        let phone = if contact.phone.is_empty() {
            store
                .fallback_phone(&contact.id)
                .unwrap_or_default()
                .to_string()
        } else {
            contact.phone.clone()
        };

        let warning = (!contact.is_contact && phone.is_empty()).then(|| {
            format!(
                "Phone number will be visible once {} adds you as a contact.",
                contact.short_name()
            )
        });

        let (share_phone, share_note) = if contact.settings.need_phone_privacy_exception {
            (
                Some(true),
                Some(format!(
                    "Your phone number will be visible to {}.",
                    contact.short_name()
                )),
            )
        } else {
            (None, None)
        };

        let mut form = Self {
            contact_id: contact.id,
            seq,
            title: if contact.is_contact {
                "EDIT CONTACT"
            } else {
                "NEW CONTACT"
            },
            first: Input::new(contact.first_name.clone()),
            last: Input::new(contact.last_name.clone()),
            phone,
            order: field_order(order),
            focus: Focus::Field(FieldRole::First),
            share_phone,
            warning,
            share_note,
            error: None,
        };
        form.focus_default();
        form
    }

    pub fn contact_id(&self) -> Uuid {
        self.contact_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn order(&self) -> [FieldRole; 2] {
        self.order
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn share_note(&self) -> Option<&str> {
        self.share_note.as_deref()
    }

    pub fn share_phone(&self) -> Option<bool> {
        self.share_phone
    }

    pub fn error(&self) -> Option<FieldRole> {
        self.error
    }

    pub fn input(&self, role: FieldRole) -> &Input {
        match role {
            FieldRole::First => &self.first,
            FieldRole::Last => &self.last,
        }
    }

    fn input_mut(&mut self, role: FieldRole) -> &mut Input {
        match role {
            FieldRole::First => &mut self.first,
            FieldRole::Last => &mut self.last,
        }
    }

    pub fn label(role: FieldRole) -> &'static str {
        match role {
            FieldRole::First => "First name",
            FieldRole::Last => "Last name",
        }
    }

    fn inverted(&self) -> bool {
        self.order[0] == FieldRole::Last
    }

    /// Trimmed, single-line-normalized value of a field.
    pub fn value(&self, role: FieldRole) -> String {
        normalize_name(self.input(role).value())
    }

    fn both_empty(&self) -> bool {
        self.value(FieldRole::First).is_empty() && self.value(FieldRole::Last).is_empty()
    }

    /// Focus the field the visual-order rule picks: the first-in-visual-order
    /// field when both names are empty, the second otherwise.
    pub fn focus_default(&mut self) {
        let focus_first = self.inverted() != self.both_empty();
        self.focus = Focus::Field(if focus_first {
            FieldRole::First
        } else {
            FieldRole::Last
        });
    }

    /// Validate and produce the values to submit. Rejects when both names
    /// are empty: refocuses, flags the refocused field, sends nothing.
    pub fn try_submit(&mut self) -> Option<(String, String)> {
        let first = self.value(FieldRole::First);
        let last = self.value(FieldRole::Last);
        if first.is_empty() && last.is_empty() {
            self.focus_default();
            self.error = Some(if self.inverted() {
                FieldRole::Last
            } else {
                FieldRole::First
            });
            return None;
        }
        Some((first, last))
    }

    /// Enter pressed inside the form: advance focus to the next empty field
    /// in visual order, or report that the form should save.
    pub fn field_submit(&mut self) -> bool {
        let empty = self.both_empty();
        let inverted = self.inverted();
        let last_focused = self.focus == Focus::Field(FieldRole::Last);
        let first_focused = self.focus == Focus::Field(FieldRole::First);

        let to_first = if inverted { last_focused } else { empty };
        if to_first {
            self.focus = Focus::Field(FieldRole::First);
            return false;
        }
        let to_last = if inverted { empty } else { first_focused };
        if to_last {
            self.focus = Focus::Field(FieldRole::Last);
            return false;
        }
        true
    }

    fn focus_ring(&self) -> Vec<Focus> {
        let mut ring: Vec<Focus> = self.order.iter().map(|role| Focus::Field(*role)).collect();
        if self.share_phone.is_some() {
            ring.push(Focus::SharePhone);
        }
        ring
    }

    pub fn focus_next(&mut self) {
        let ring = self.focus_ring();
        let index = ring.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = ring[(index + 1) % ring.len()];
    }

    pub fn focus_prev(&mut self) {
        let ring = self.focus_ring();
        let index = ring.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = ring[(index + ring.len() - 1) % ring.len()];
    }

    /// Flip the checkbox if it exists and has focus.
    pub fn toggle_share(&mut self) -> bool {
        if self.focus != Focus::SharePhone {
            return false;
        }
        if let Some(checked) = &mut self.share_phone {
            *checked = !*checked;
            return true;
        }
        false
    }

    /// Route a key to the focused text input.
    pub fn handle_input_key(&mut self, key: KeyEvent) -> bool {
        let Focus::Field(role) = self.focus else {
            return false;
        };
        let handled = self
            .input_mut(role)
            .handle_event(&Event::Key(key))
            .is_some();
        if handled {
            self.error = None;
        }
        handled
    }

    pub fn build_request(&self, first: String, last: String) -> AddContactRequest {
        AddContactRequest {
            id: self.contact_id,
            first_name: first,
            last_name: last,
            phone: self.phone.clone(),
            add_phone_privacy_exception: self.share_phone == Some(true),
        }
    }
}
