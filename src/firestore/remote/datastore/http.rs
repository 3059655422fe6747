use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::HeartbeatService;
use crate::firestore::api::{DocumentSnapshot, SnapshotMetadata};
use crate::firestore::error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
use crate::firestore::logger::LOGGER;
use crate::firestore::model::{DatabaseId, DocumentKey};
use crate::firestore::remote::connection::{Connection, ConnectionBuilder, RequestContext};
use crate::firestore::remote::serializer::JsonProtoSerializer;
use crate::platform::runtime::sleep as runtime_sleep;

use super::{Datastore, NoopTokenProvider, TokenProviderArc};

/// Datastore speaking the Firestore REST API.
#[derive(Clone)]
pub struct HttpDatastore {
    connection: Connection,
    serializer: JsonProtoSerializer,
    auth_provider: TokenProviderArc,
    heartbeat: Option<Arc<HeartbeatService>>,
    retry: RetrySettings,
}

#[derive(Clone)]
pub struct HttpDatastoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    heartbeat: Option<Arc<HeartbeatService>>,
    retry: RetrySettings,
}

#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            multiplier: 1.5,
            max_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl RetrySettings {
    /// A single attempt: failures surface immediately.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn should_retry(&self, attempt: usize, error: &FirestoreError) -> bool {
        if attempt + 1 >= self.max_attempts {
            return false;
        }

        error.code.is_transient()
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

impl HttpDatastore {
    pub fn builder(database_id: DatabaseId) -> HttpDatastoreBuilder {
        HttpDatastoreBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        self.connection.base_url()
    }

    async fn build_request_context(&self) -> FirestoreResult<RequestContext> {
        let auth_token = self.auth_provider.get_token().await?;
        Ok(RequestContext {
            auth_token,
            heartbeat_header: self.heartbeat_header().await,
            request_timeout: Some(self.retry.request_timeout),
        })
    }

    async fn heartbeat_header(&self) -> Option<String> {
        let service = self.heartbeat.as_ref()?;
        if let Err(err) = service.trigger_heartbeat().await {
            LOGGER.debug(format!("Failed to record heartbeat: {err}"));
        }
        match service.heartbeats_header().await {
            Ok(header) => header,
            Err(err) => {
                LOGGER.debug(format!("Skipping heartbeat header: {err}"));
                None
            }
        }
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let mut attempt = 0usize;
        let response = loop {
            let context = self.build_request_context().await?;
            match self.connection.get_document_json(key.path(), &context).await {
                Ok(response) => break response,
                Err(err) => {
                    if !self.retry.should_retry(attempt, &err) {
                        return Err(err);
                    }
                    if err.code == FirestoreErrorCode::Unauthenticated {
                        self.auth_provider.invalidate_token();
                    }
                    runtime_sleep(self.retry.backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        };

        let data = match response {
            Some(json) => Some(self.serializer.decode_document_fields(&json)?),
            None => None,
        };
        Ok(DocumentSnapshot::new(
            key.clone(),
            data,
            SnapshotMetadata::new(false, false),
        ))
    }
}

impl HttpDatastoreBuilder {
    fn new(database_id: DatabaseId) -> Self {
        let auth_provider: TokenProviderArc = Arc::new(NoopTokenProvider);
        let connection_builder = Connection::builder(database_id.clone());
        Self {
            database_id,
            connection_builder,
            auth_provider,
            heartbeat: None,
            retry: RetrySettings::default(),
        }
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_heartbeat_service(mut self, service: Arc<HeartbeatService>) -> Self {
        self.heartbeat = Some(service);
        self
    }

    pub fn with_retry_settings(mut self, settings: RetrySettings) -> Self {
        self.retry = settings;
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.connection_builder = self.connection_builder.with_emulator_host(host);
        self
    }

    pub fn build(self) -> FirestoreResult<HttpDatastore> {
        let connection = self.connection_builder.build()?;
        Ok(HttpDatastore {
            connection,
            serializer: JsonProtoSerializer::new(self.database_id),
            auth_provider: self.auth_provider,
            heartbeat: self.heartbeat,
            retry: self.retry,
        })
    }
}
