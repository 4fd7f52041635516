#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod settings;
pub mod storage;
pub mod telemetry;
pub mod workers;

use crate::api::{AppState, MgmtState};
use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::event::BroadcastListener;
use crate::services::{ContainerService, HealthService, ToastService};
use crate::settings::ToastSettings;
use crate::storage::SessionStore;
use crate::workers::{SessionGcWorker, ToastEventWorker};
use axum::http::HeaderName;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background tasks owned by the server.
#[derive(Debug)]
pub struct Workers {
    session_gc: SessionGcWorker,
    toast_events: ToastEventWorker,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.session_gc.run(shutdown.clone())),
            tokio::spawn(self.toast_events.run(shutdown)),
        ]
    }
}

/// Wired services and workers, ready to be served.
#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub mgmt_state: MgmtState,
    pub workers: Workers,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    settings: Option<Arc<ToastSettings>>,
    store: Option<Arc<dyn SessionStore>>,
    clock: Arc<dyn Clock>,
}

impl AppBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config, settings: None, store: None, clock: Arc::new(SystemClock) }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Arc<ToastSettings>) -> Self {
        self.settings = Some(settings);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Loads settings and connects the session store unless they were supplied.
    ///
    /// # Errors
    /// Returns an error if the toast settings are invalid, the store cannot be
    /// reached, or the session header name is not a valid header.
    pub async fn build(self) -> anyhow::Result<App> {
        let settings = match self.settings {
            Some(settings) => settings,
            None => Arc::new(ToastSettings::load(self.config.settings_path.as_deref())?),
        };
        let store = match self.store {
            Some(store) => store,
            None => storage::init_store(&self.config.session).await?,
        };
        let session_header = HeaderName::from_bytes(self.config.session.session_header.as_bytes())?;

        let events = Arc::new(BroadcastListener::new(self.config.session.event_channel_capacity));
        let event_rx = events.subscribe();

        let toast_service =
            ToastService::new(settings, Arc::clone(&store), self.clock).with_listener(events);
        let container_service = ContainerService::new(toast_service.clone());
        let health_service = HealthService::new(store);

        let workers = Workers {
            session_gc: SessionGcWorker::new(toast_service.clone(), self.config.session.gc_interval_secs),
            toast_events: ToastEventWorker::new(event_rx),
        };

        Ok(App {
            state: AppState { toast_service, container_service, session_header },
            mgmt_state: MgmtState { health_service },
            workers,
        })
    }
}

/// Flips the shutdown flag on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
            () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }

        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through `tracing` so they reach structured logs.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Process panicked");
        default_hook(info);
    }));
}
