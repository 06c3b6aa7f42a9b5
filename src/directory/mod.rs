//! Directory server abstraction and wire types.
//!
//! This module provides:
//! - `Directory` trait for abstracting the contact directory transport
//! - `HttpDirectory` implementation speaking JSON over HTTP
//! - Types for the add-contact request and the server's update batches

pub mod http;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::contact::Contact;

/// The one message the edit form sends: persist a contact's name, share the
/// resolved phone, and optionally grant a phone privacy exception.
#[derive(Debug, Clone, Serialize)]
pub struct AddContactRequest {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Omitted from the wire when false.
    #[serde(skip_serializing_if = "is_false")]
    pub add_phone_privacy_exception: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Partial contact update carried in an [`UpdateBatch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPatch {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_contact: Option<bool>,
}

/// Generic update payload returned by mutating calls.
///
/// Only contact patches are interpreted; everything else the server includes
/// rides along in `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBatch {
    #[serde(default)]
    pub contacts: Vec<ContactPatch>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Contact listing plus phone numbers the server learned from other sources
/// for peers that hide their own.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub phone_hints: HashMap<Uuid, String>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected the request with status {status}")]
    Status { status: reqwest::StatusCode },
    #[error("malformed server response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Trait for directory server implementations
#[allow(async_fn_in_trait)]
pub trait Directory {
    /// List all contacts visible to this session
    async fn list_contacts(&self) -> Result<ContactsResponse, DirectoryError>;

    /// Persist a contact's name and phone visibility choice.
    /// Returns the server's update batch to apply to the session store.
    async fn add_contact(&self, request: &AddContactRequest) -> Result<UpdateBatch, DirectoryError>;
}
