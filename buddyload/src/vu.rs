//! Per virtual user state.
//!
//! Every VU owns its own HTTP client, and with it its own connection pool and cookie jar, so
//! a session opened by one request is seen by the next request of the same VU only.
use buddyload_core::DEFAULT_REQUEST_TIMEOUT;
use reqwest::{redirect, Client};
use std::sync::OnceLock;

pub(crate) struct VuContext {
    pub id: usize,
    pub client: Client,
}

tokio::task_local! {
    pub(crate) static VU: VuContext;
}

/// Index of the current virtual user, or `None` outside a running scenario.
pub fn id() -> Option<usize> {
    VU.try_with(|vu| vu.id).ok()
}

/// HTTP client of the current virtual user.
///
/// Outside a running scenario a process-wide client with the same settings is returned.
pub fn client() -> Client {
    VU.try_with(|vu| vu.client.clone())
        .unwrap_or_else(|_| shared_client().clone())
}

/// Build a client the way every VU gets one: a cookie store, no redirect following so 3xx
/// statuses reach checks, and the default request timeout.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}

fn shared_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        build_client().unwrap_or_else(|err| {
            tracing::error!("Falling back to a default HTTP client: {err}");
            Client::default()
        })
    })
}
