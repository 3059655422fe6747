use std::fmt;
use std::str::FromStr;

use crate::panel::error::PanelError;

/// One button of the regression panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Init,
    Clear,
    Login,
    Logout,
    GetDocument,
    DeleteHeartbeatFolder,
    DeleteFirestoreFolder,
    DeleteLogsAndConfigs,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Init,
        Action::Clear,
        Action::Login,
        Action::Logout,
        Action::GetDocument,
        Action::DeleteHeartbeatFolder,
        Action::DeleteFirestoreFolder,
        Action::DeleteLogsAndConfigs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Clear => "clear",
            Action::Login => "login",
            Action::Logout => "logout",
            Action::GetDocument => "get-document",
            Action::DeleteHeartbeatFolder => "delete-heartbeat",
            Action::DeleteFirestoreFolder => "delete-firestore",
            Action::DeleteLogsAndConfigs => "delete-logs",
        }
    }

    /// Prefix of the error line logged when the action fails.
    ///
    /// `Clear` shares the sign-out label with `Logout`.
    pub fn error_label(self) -> &'static str {
        match self {
            Action::Init => "Could not resolve all Firebase dependencies",
            Action::Clear => "Error during sign out",
            Action::Login => "Error during sign in",
            Action::Logout => "Error during sign out",
            Action::GetDocument => "Error getting document",
            Action::DeleteHeartbeatFolder => "Error deleting heartbeat folder",
            Action::DeleteFirestoreFolder => "Error deleting Firestore folder",
            Action::DeleteLogsAndConfigs => "Error deleting logs and configs",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Action::ALL
            .into_iter()
            .find(|action| action.name() == wanted)
            .ok_or_else(|| PanelError::UnknownAction(s.trim().to_string()))
    }
}
