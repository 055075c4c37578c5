use std::panic;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::warn;

/// Exit code used when a run is interrupted, like a shell does for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

pub fn on_panic<F>(func: F)
where
    F: Fn(&panic::PanicHookInfo) + Send + Sync + 'static,
{
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        func(panic_info);
        default_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Aborts the process on SIGTERM or SIGINT. A simulation has no partial result
/// worth keeping, so nothing is flushed.
#[cfg(unix)]
pub fn exit_on_signal() -> std::io::Result<JoinHandle<()>> {
    let mut sigterm_stream = signal(SignalKind::terminate())?;
    let mut sigint_stream = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = sigterm_stream.recv() => {
                warn!("Received SIGTERM signal, aborting run");
            }
            _ = sigint_stream.recv() => {
                warn!("Received SIGINT signal, aborting run");
            }
        }

        std::process::exit(INTERRUPTED_EXIT_CODE);
    }))
}

#[cfg(windows)]
pub fn exit_on_signal() -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C signal, aborting run");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }))
}
