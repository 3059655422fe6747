pub mod paths;
pub mod runtime;

pub use paths::{app_storage_name, local_data_dir, LocalDataLayout};
