//! Cloud Firestore client: document references, single-document reads over
//! the REST API and an on-disk document cache with terminate/clear semantics.

pub mod api;
mod constants;
pub mod error;
pub mod local;
mod logger;
pub mod model;
pub mod remote;
pub mod value;

pub use api::{
    CollectionReference, DocumentReference, DocumentSnapshot, Firestore, FirestoreBuilder,
    FirestoreSettings, SnapshotMetadata,
};
pub use constants::{DEFAULT_DATABASE_ID, FIRESTORE_EMULATOR_HOST_ENV};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DatabaseId, DocumentKey, ResourcePath};
pub use remote::{Datastore, InMemoryDatastore, RetrySettings, TokenProvider, TokenProviderArc};
pub use value::{FirestoreValue, MapValue, ValueKind};
