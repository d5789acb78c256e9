//! `consignes serve`: run the caching proxy in the foreground.

use crate::config::ConsignesConfig;
use crate::error::{Error, Result};

/// Serves until interrupted.
pub async fn handle(config: &ConsignesConfig, bind: Option<&str>) -> Result<()> {
    let proxy = config.proxy_config(bind);
    if proxy.upstream.trim().is_empty() {
        return Err(Error::config(
            "No upstream: set backend.url or proxy.upstream (or CONSIGNES_BACKEND_URL)",
        ));
    }
    consignes_proxy::serve(proxy).await?;
    Ok(())
}
