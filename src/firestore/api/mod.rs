mod database;
mod reference;
mod settings;
mod snapshot;

pub use database::{Firestore, FirestoreBuilder};
pub use reference::{CollectionReference, DocumentReference};
pub use settings::FirestoreSettings;
pub use snapshot::{DocumentSnapshot, SnapshotMetadata};
