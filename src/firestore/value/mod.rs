mod bytes_value;
mod map_value;
mod value;

pub use bytes_value::BytesValue;
pub use map_value::MapValue;
pub use value::{FirestoreValue, ValueKind};
