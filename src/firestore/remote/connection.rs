use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, StatusCode};
use serde_json::Value as JsonValue;

use crate::firestore::constants::{DEFAULT_HOST, FIRESTORE_EMULATOR_HOST_ENV};
use crate::firestore::error::{internal_error, unavailable, FirestoreResult};
use crate::firestore::model::{DatabaseId, ResourcePath};

use super::rpc_error::map_http_error;

const FIRESTORE_API_VERSION: &str = "v1";

// Path segment escaping; `/` stays reserved as the separator.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    client: Option<Client>,
    emulator_host: Option<String>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub heartbeat_header: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            client: None,
            emulator_host: std::env::var(FIRESTORE_EMULATOR_HOST_ENV).ok(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn build(self) -> FirestoreResult<Connection> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        let base_url = build_base_url(&self.database_id, self.emulator_host.as_deref());
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches `documents/<path>`; a 404 resolves to `Ok(None)`.
    pub async fn get_document_json(
        &self,
        path: &ResourcePath,
        context: &RequestContext,
    ) -> FirestoreResult<Option<JsonValue>> {
        let url = format!("{}/documents/{}", self.base_url, encode_path(path));
        let mut request = self.client.get(url);
        if let Some(timeout) = context.request_timeout {
            request = request.timeout(timeout);
        }
        if let Some(token) = context.auth_token.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(header) = context.heartbeat_header.as_deref() {
            request = request.header("X-Firebase-Client", header);
        }

        let response = request
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        if status.is_success() {
            if text.is_empty() {
                Ok(Some(JsonValue::Null))
            } else {
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|err| internal_error(err.to_string()))
            }
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(map_http_error(status, &text))
        }
    }
}

fn encode_path(path: &ResourcePath) -> String {
    path.segments()
        .iter()
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_base_url(database_id: &DatabaseId, emulator_host: Option<&str>) -> String {
    let origin = match emulator_host {
        Some(host) => format!("http://{host}"),
        None => format!("https://{DEFAULT_HOST}"),
    };
    format!(
        "{origin}/{FIRESTORE_API_VERSION}/projects/{}/databases/{}",
        database_id.project_id(),
        database_id.database()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_and_emulator_urls() {
        let db = DatabaseId::default("demo");
        assert_eq!(
            build_base_url(&db, None),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)"
        );
        assert_eq!(
            build_base_url(&db, Some("127.0.0.1:8080")),
            "http://127.0.0.1:8080/v1/projects/demo/databases/(default)"
        );
    }

    #[test]
    fn escapes_segments_but_not_separators() {
        let path = ResourcePath::from_segments(["User", "a b?c"]);
        assert_eq!(encode_path(&path), "User/a%20b%3Fc");
    }
}
