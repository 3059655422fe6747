//! The trigger surface of the harness: eight named actions, each run
//! fire-and-forget with failures logged under a fixed label.

mod action;
mod action_panel;
mod error;
mod logger;

#[doc(inline)]
pub use action::Action;

#[doc(inline)]
pub use action_panel::{forget, ActionPanel};

#[doc(inline)]
pub use error::{PanelError, PanelResult};
