mod database_id;
mod document_key;
mod resource_path;

pub use database_id::DatabaseId;
pub use document_key::DocumentKey;
pub use resource_path::ResourcePath;
