use tracing::{debug, error};

pub async fn shutdown_signal() {
    let str = wait_for_stop_signal().await;
    debug!("Received signal: {}", str);
}

/// Waits for SIGTERM or SIGINT. A handler that cannot be installed never fires.
#[cfg(unix)]
async fn wait_for_stop_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut s) => s.recv().await,
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending().await
            }
        }
    };

    tokio::select! {
        _ = terminate => "SIGTERM",
        _ = ctrl_c() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> &'static str {
    ctrl_c().await;
    "CTRL_C"
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await
    }
}

/// Reads `path`, or `<name>.toml` then `/etc/<name>/<name>.toml` when no path
/// is given. No file at all yields the defaults.
pub fn load<T>(name: &str, path: Option<String>) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned + std::default::Default,
{
    use std::fs::read_to_string;

    let content = match path {
        Some(path) => read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path, e))?,
        None => read_to_string(format!("{name}.toml"))
            .or_else(|_| read_to_string(format!("/etc/{name}/{name}.toml")))
            .unwrap_or_default(),
    };
    toml::from_str(&content).map_err(|e| anyhow::anyhow!("config load error: {}", e))
}
