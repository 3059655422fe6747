//! Manual regression harness for the Firebase Auth and Cloud Firestore clients.
//!
//! The harness wires eight actions to one Firebase app: initialize, clear
//! Firestore persistence, sign in from `credentials.json`, sign out, fetch the
//! signed-in user's `User/{uid}` document, and three cleanups of the on-disk
//! state the clients keep under the local application data directory.
//!
//! ```no_run
//! use firebase_manual_regression::config::RegressionConfig;
//! use firebase_manual_regression::panel::{Action, ActionPanel};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RegressionConfig::from_json_file("regression.json")?;
//! let panel = ActionPanel::from_config(&config)?;
//! panel.start();
//! panel.dispatch(Action::Init).await?;
//! panel.dispatch(Action::Login).await?;
//! panel.dispatch(Action::GetDocument).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod firestore;
pub mod logger;
pub mod panel;
pub mod platform;
pub mod session;

#[cfg(test)]
pub mod test_support;
