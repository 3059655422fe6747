use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::cache::LocalCacheCleaner;
use crate::config::RegressionConfig;
use crate::logger::Logger;
use crate::panel::action::Action;
use crate::panel::error::PanelResult;
use crate::panel::logger::LOGGER;
use crate::platform::runtime::spawn_detached;
use crate::session::SessionController;

/// Awaits `task` and logs its error as `"<label>: <error>"`.
pub async fn forget<F, T, E>(task: F, label: &str, logger: &Logger) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match task.await {
        Ok(value) => Some(value),
        Err(err) => {
            logger.error(format!("{label}: {err}"));
            None
        }
    }
}

/// Maps each [`Action`] onto the session controller or the cache cleaner.
pub struct ActionPanel {
    session: Arc<SessionController>,
    cleaner: Arc<LocalCacheCleaner>,
    app_version: String,
    logger: Logger,
}

impl ActionPanel {
    pub fn new(session: Arc<SessionController>, cleaner: Arc<LocalCacheCleaner>) -> Self {
        Self {
            session,
            cleaner,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            logger: LOGGER.clone(),
        }
    }

    pub fn from_config(config: &RegressionConfig) -> PanelResult<Self> {
        let session = config.session_controller()?;
        let cleaner = config.cache_cleaner()?;
        Ok(Self::new(Arc::new(session), Arc::new(cleaner)).with_app_version(config.app_version.clone()))
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    pub fn cleaner(&self) -> &Arc<LocalCacheCleaner> {
        &self.cleaner
    }

    pub fn start(&self) {
        self.logger.info(format!("App version: {}", self.app_version));
    }

    /// Runs `action` to completion and returns its error, if any.
    pub async fn dispatch(&self, action: Action) -> PanelResult<()> {
        match action {
            Action::Init => self.session.initialize().await?,
            Action::Clear => self.session.clear().await?,
            Action::Login => {
                self.session.sign_in().await?;
            }
            Action::Logout => self.session.sign_out().await?,
            Action::GetDocument => {
                self.session.fetch_user_document().await?;
            }
            Action::DeleteHeartbeatFolder => {
                self.cleaner.delete_heartbeat_folder().await?;
            }
            Action::DeleteFirestoreFolder => {
                self.cleaner.delete_firestore_folder().await?;
            }
            Action::DeleteLogsAndConfigs => {
                self.cleaner.delete_logs_and_configs().await?;
            }
        }
        Ok(())
    }

    /// Runs `action` and logs a failure under the action's label.
    pub async fn run(&self, action: Action) -> bool {
        forget(self.dispatch(action), action.error_label(), &self.logger)
            .await
            .is_some()
    }

    /// Starts `action` in the background and returns immediately.
    ///
    /// Actions are not serialized against each other. Returns `false` when no
    /// runtime was available to run it.
    pub fn trigger(self: &Arc<Self>, action: Action) -> bool {
        let panel = Arc::clone(self);
        spawn_detached(async move {
            panel.run(action).await;
        })
    }
}
