#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc, unreachable_pub)]

use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use time::OffsetDateTime;
use toastify_server::config::Config;
use toastify_server::domain::clock::{Clock, ManualClock};
use toastify_server::services::ToastService;
use toastify_server::settings::{BUNDLED_SETTINGS, ToastSettings};
use toastify_server::storage::{MemorySessionStore, SessionStore};
use toastify_server::{App, AppBuilder};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(toastify_server::telemetry::init_test_telemetry);
}

pub fn start_time() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

/// Bundled settings with `mutate` applied to the raw document.
pub fn settings_with(mutate: impl FnOnce(&mut Value)) -> Arc<ToastSettings> {
    let mut value: Value = serde_json::from_str(BUNDLED_SETTINGS).unwrap();
    mutate(&mut value);
    Arc::new(ToastSettings::from_value(value).unwrap())
}

pub struct Harness {
    pub service: ToastService,
    pub store: Arc<MemorySessionStore>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(mutate: impl FnOnce(&mut Value)) -> Harness {
    setup_tracing();
    let store = Arc::new(MemorySessionStore::default());
    let clock = Arc::new(ManualClock::new(start_time()));
    let service = ToastService::new(
        settings_with(mutate),
        Arc::clone(&store) as Arc<dyn SessionStore>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    Harness { service, store, clock }
}

pub fn get_test_config() -> Config {
    use clap::Parser;
    Config::try_parse_from(["toastify-server", "--host", "127.0.0.1", "--port", "0", "--mgmt-port", "0"]).unwrap()
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemorySessionStore>,
    pub shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(settings_with(|_| {})).await
    }

    pub async fn spawn_with_settings(settings: Arc<ToastSettings>) -> Self {
        setup_tracing();
        let store = Arc::new(MemorySessionStore::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let App { state, mgmt_state, workers } = AppBuilder::new(get_test_config())
            .with_settings(settings)
            .with_store(Arc::clone(&store) as Arc<dyn SessionStore>)
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .build()
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let _ = workers.spawn_all(shutdown_rx);

        let api_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_addr: SocketAddr = api_listener.local_addr().unwrap();
        let mgmt_addr: SocketAddr = mgmt_listener.local_addr().unwrap();

        let app_router = toastify_server::api::app_router(state);
        let mgmt_router = toastify_server::api::mgmt_router(mgmt_state);
        tokio::spawn(async move { axum::serve(api_listener, app_router).await.unwrap() });
        tokio::spawn(async move { axum::serve(mgmt_listener, mgmt_router).await.unwrap() });

        Self {
            server_url: format!("http://{api_addr}"),
            mgmt_url: format!("http://{mgmt_addr}"),
            client: reqwest::Client::new(),
            clock,
            store,
            shutdown_tx,
        }
    }
}
