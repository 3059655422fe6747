//! Email/password sign-in against the Identity Toolkit REST API.
//!
//! The signed-in user is kept in memory and, when a [`FilePersistence`] is
//! installed, under the app's `firebase-auth` folder so it survives restarts.
//! [`Auth::token_provider`] hands the user's ID token to Firestore.

mod api;
mod error;
mod logger;
mod model;
mod persistence;
mod token_manager;
mod token_provider;

#[doc(inline)]
pub use api::token::{refresh_id_token_with_endpoint, RefreshTokenResponse};

#[doc(inline)]
pub use api::{Auth, AuthBuilder, AUTH_EMULATOR_HOST_ENV};

#[doc(inline)]
pub use error::{AuthError, AuthResult};

#[doc(inline)]
pub use model::{
    EmailAuthProvider, SignInWithPasswordRequest, SignInWithPasswordResponse, User,
    UserCredential, UserInfo,
};

#[doc(inline)]
pub use persistence::{AuthPersistence, FilePersistence, InMemoryPersistence, PersistedAuthState};

pub use token_manager::TokenManager;

#[doc(inline)]
pub use token_provider::{auth_token_provider_arc, AuthTokenProvider};
