use std::{sync::OnceLock, time::Duration};

use tracing::debug;

use crate::Result;

/// reqwest is built without a bundled rustls provider; install one once.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the client used for Bot API calls.
///
/// `connect_timeout` bounds connection setup only; long polls and large
/// transfers are not given a total timeout.
pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    install_rustls_provider();

    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(4)
        .user_agent(concat!("autorename/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
