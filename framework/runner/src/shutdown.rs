use query_bench_core::prelude::ShutdownHandle;
use tokio::signal;

/// Trigger `handle` when the process receives Ctrl-C.
pub(crate) fn start_shutdown_listener(runtime: &tokio::runtime::Runtime) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received shutdown signal, shutting down...");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C, shutdown must be external: {e}"),
        }
    });

    handle
}
