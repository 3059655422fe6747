//! The session side of the regression harness.
//!
//! [`SessionController`] owns the Auth and Firestore clients of one app and
//! exposes the five session actions. Clients come from a [`ClientFactory`]
//! so tests can point them at mock endpoints.

mod clients;
mod controller;
mod credentials;
mod error;
mod logger;

#[doc(inline)]
pub use clients::{ClientFactory, DefaultClientFactory, SessionClients};

#[doc(inline)]
pub use controller::{FetchPacing, SessionController, USER_COLLECTION};

#[doc(inline)]
pub use credentials::{Credentials, CREDENTIALS_FILE_NAME};

#[doc(inline)]
pub use error::{SessionError, SessionResult};
