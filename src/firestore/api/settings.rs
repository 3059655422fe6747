/// Client settings that must be fixed before the first document read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirestoreSettings {
    /// Keep fetched documents in the on-disk cache and serve them while offline.
    pub persistence_enabled: bool,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            persistence_enabled: true,
        }
    }
}
