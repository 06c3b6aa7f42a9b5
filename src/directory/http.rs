//! JSON-over-HTTP directory client using reqwest.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use crate::config::ServerConfig;
use crate::directory::{
    AddContactRequest, ContactsResponse, Directory, DirectoryError, UpdateBatch,
};

/// Directory client for a peerbook server
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDirectory {
    /// Create a new client from configuration
    pub fn new(config: &ServerConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl Directory for HttpDirectory {
    async fn list_contacts(&self) -> Result<ContactsResponse, DirectoryError> {
        let response = self
            .authorized(self.client.get(self.url("contacts")))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status { status });
        }

        response
            .json::<ContactsResponse>()
            .await
            .map_err(DirectoryError::Decode)
    }

    async fn add_contact(&self, request: &AddContactRequest) -> Result<UpdateBatch, DirectoryError> {
        let response = self
            .authorized(self.client.post(self.url("contacts")))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status { status });
        }

        response
            .json::<UpdateBatch>()
            .await
            .map_err(DirectoryError::Decode)
    }
}
