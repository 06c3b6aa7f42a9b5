//! Session data model: contacts, their privacy settings, and the in-memory
//! store the UI reads and the server's update batches mutate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::UpdateBatch;

/// Per-contact capabilities and hints reported by the directory server.
///
/// The server models these as a flag set; here each flag is a named boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSettings {
    /// The peer hid their phone; adding them may include a one-off exception.
    pub need_phone_privacy_exception: bool,
    /// UI may suggest adding this peer as a contact.
    pub suggest_add_contact: bool,
    /// UI may suggest blocking this peer.
    pub suggest_block: bool,
    /// UI may suggest reporting this peer as spam.
    pub suggest_report_spam: bool,
}

impl PeerSettings {
    /// Drop the suggestion flags after the peer became a contact.
    /// `need_phone_privacy_exception` is left untouched.
    pub fn clear_suggestions(&mut self) {
        self.suggest_add_contact = false;
        self.suggest_block = false;
        self.suggest_report_spam = false;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// May be empty when the peer hides their number.
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_contact: bool,
    #[serde(default)]
    pub settings: PeerSettings,
}

impl Contact {
    pub fn display_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => self.phone.clone(),
        }
    }

    /// First name if present, else last name, else the phone.
    pub fn short_name(&self) -> &str {
        if !self.first_name.is_empty() {
            &self.first_name
        } else if !self.last_name.is_empty() {
            &self.last_name
        } else {
            &self.phone
        }
    }

    pub fn set_name(&mut self, first: &str, last: &str) {
        self.first_name = first.to_string();
        self.last_name = last.to_string();
    }
}

/// Collapse a name to a single trimmed line. Control characters (pasted
/// newlines, tabs) become spaces.
pub fn normalize_name(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Locale rule rendering family name before given name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOrder {
    GivenFirst,
    FamilyFirst,
}

impl NameOrder {
    pub fn inverted(self) -> bool {
        matches!(self, NameOrder::FamilyFirst)
    }

    /// Resolve the order from a locale string such as `ja_JP.UTF-8`.
    pub fn from_locale(locale: &str) -> Self {
        const FAMILY_FIRST: &[&str] = &["ja", "ko", "zh", "hu", "vi"];
        let lang = locale
            .split(['_', '.', '@'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if FAMILY_FIRST.iter().any(|l| *l == lang) {
            NameOrder::FamilyFirst
        } else {
            NameOrder::GivenFirst
        }
    }

    /// Resolve from the process environment (`LC_ALL`, `LC_MESSAGES`, `LANG`).
    pub fn from_env() -> Self {
        for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    return Self::from_locale(&value);
                }
            }
        }
        NameOrder::GivenFirst
    }
}

/// In-memory session store backing the UI.
///
/// Holds the directory's contact list plus phone numbers learned from other
/// sources for peers that hide their own (the fallback the edit form resolves
/// when the contact record has no phone).
#[derive(Debug, Default)]
pub struct Store {
    contacts: Vec<Contact>,
    fallback_phones: HashMap<Uuid, String>,
}

impl Store {
    pub fn new(contacts: Vec<Contact>, fallback_phones: HashMap<Uuid, String>) -> Self {
        Self {
            contacts,
            fallback_phones,
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == *id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id == *id)
    }

    /// Phone learned from a source other than the contact record itself.
    pub fn fallback_phone(&self, id: &Uuid) -> Option<&str> {
        self.fallback_phones.get(id).map(String::as_str)
    }

    pub fn record_phone_hint(&mut self, id: Uuid, phone: String) {
        if !phone.is_empty() {
            self.fallback_phones.insert(id, phone);
        }
    }

    pub fn set_name(&mut self, id: &Uuid, first: &str, last: &str) {
        if let Some(contact) = self.get_mut(id) {
            contact.set_name(first, last);
        }
    }

    pub fn clear_suggestions(&mut self, id: &Uuid) {
        if let Some(contact) = self.get_mut(id) {
            contact.settings.clear_suggestions();
        }
    }

    /// Apply a server update batch. Patches for known contacts update the
    /// fields they carry; patches for unknown ids append new contacts.
    pub fn apply(&mut self, batch: &UpdateBatch) {
        for patch in &batch.contacts {
            match self.get_mut(&patch.id) {
                Some(contact) => {
                    if let Some(first) = &patch.first_name {
                        contact.first_name = first.clone();
                    }
                    if let Some(last) = &patch.last_name {
                        contact.last_name = last.clone();
                    }
                    if let Some(phone) = &patch.phone {
                        contact.phone = phone.clone();
                    }
                    if let Some(is_contact) = patch.is_contact {
                        contact.is_contact = is_contact;
                    }
                }
                None => self.contacts.push(Contact {
                    id: patch.id,
                    first_name: patch.first_name.clone().unwrap_or_default(),
                    last_name: patch.last_name.clone().unwrap_or_default(),
                    phone: patch.phone.clone().unwrap_or_default(),
                    is_contact: patch.is_contact.unwrap_or(false),
                    settings: PeerSettings::default(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ContactPatch;

    fn contact(first: &str, last: &str, phone: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: phone.to_string(),
            is_contact: false,
            settings: PeerSettings::default(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_phone() {
        assert_eq!(contact("Ada", "Lovelace", "").display_name(), "Ada Lovelace");
        assert_eq!(contact("Ada", "", "").display_name(), "Ada");
        assert_eq!(contact("", "Lovelace", "").display_name(), "Lovelace");
        assert_eq!(contact("", "", "+4911222").display_name(), "+4911222");
    }

    #[test]
    fn test_short_name_prefers_first() {
        assert_eq!(contact("Ada", "Lovelace", "").short_name(), "Ada");
        assert_eq!(contact("", "Lovelace", "").short_name(), "Lovelace");
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Ada \n Lovelace \r"), "Ada   Lovelace");
        assert_eq!(normalize_name("Love\tlace"), "Love lace");
        assert_eq!(normalize_name("\t"), "");
    }

    #[test]
    fn test_name_order_from_locale() {
        assert_eq!(NameOrder::from_locale("ja_JP.UTF-8"), NameOrder::FamilyFirst);
        assert_eq!(NameOrder::from_locale("hu"), NameOrder::FamilyFirst);
        assert_eq!(NameOrder::from_locale("en_US.UTF-8"), NameOrder::GivenFirst);
        assert_eq!(NameOrder::from_locale(""), NameOrder::GivenFirst);
    }

    #[test]
    fn test_clear_suggestions_keeps_privacy_exception() {
        let mut settings = PeerSettings {
            need_phone_privacy_exception: true,
            suggest_add_contact: true,
            suggest_block: true,
            suggest_report_spam: true,
        };
        settings.clear_suggestions();
        assert!(settings.need_phone_privacy_exception);
        assert!(!settings.suggest_add_contact);
        assert!(!settings.suggest_block);
        assert!(!settings.suggest_report_spam);
    }

    #[test]
    fn test_apply_updates_known_contact() {
        let mut store = Store::new(vec![contact("Ada", "", "")], HashMap::new());
        let id = store.contacts()[0].id;
        let batch = UpdateBatch {
            contacts: vec![ContactPatch {
                id,
                first_name: None,
                last_name: Some("Lovelace".to_string()),
                phone: None,
                is_contact: Some(true),
            }],
            extra: Default::default(),
        };
        store.apply(&batch);
        let updated = store.get(&id).unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Lovelace");
        assert!(updated.is_contact);
    }

    #[test]
    fn test_apply_appends_unknown_contact() {
        let mut store = Store::default();
        let id = Uuid::new_v4();
        let batch = UpdateBatch {
            contacts: vec![ContactPatch {
                id,
                first_name: Some("Grace".to_string()),
                last_name: None,
                phone: None,
                is_contact: None,
            }],
            extra: Default::default(),
        };
        store.apply(&batch);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().first_name, "Grace");
    }

    #[test]
    fn test_fallback_phone_lookup() {
        let mut store = Store::new(vec![contact("Ada", "", "")], HashMap::new());
        let id = store.contacts()[0].id;
        assert_eq!(store.fallback_phone(&id), None);
        store.record_phone_hint(id, "+15550100".to_string());
        assert_eq!(store.fallback_phone(&id), Some("+15550100"));
        // Empty hints are not recorded.
        store.record_phone_hint(id, String::new());
        assert_eq!(store.fallback_phone(&id), Some("+15550100"));
    }
}
