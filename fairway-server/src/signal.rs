use tokio::signal::unix::{signal, SignalKind};

/// Resolves once the process receives SIGINT or SIGTERM.
pub async fn wait() {
    let mut terminate = signal(SignalKind::terminate()).unwrap();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}
