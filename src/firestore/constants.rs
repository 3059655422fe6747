pub const DEFAULT_DATABASE_ID: &str = "(default)";
pub const DEFAULT_HOST: &str = "firestore.googleapis.com";
pub const FIRESTORE_EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";
