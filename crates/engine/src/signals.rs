//! Unix signal handling for the child.
//!
//! The host coerces the child through the container runtime with
//! SIGUSR1 (pause) and SIGUSR2 (stop). Both map onto the same in-process
//! actions the loop itself uses: a lifecycle transition plus cancellation
//! of any in-flight provider or tool call.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

/// In-process action derived from a delivered signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// SIGUSR1: transition `pause`, abort in-flight work, keep ticking.
    Pause,
    /// SIGUSR2: transition `stop`, abort, exit.
    Stop,
}

/// Install the handlers and stream actions to the loop.
pub fn spawn_listeners() -> std::io::Result<mpsc::Receiver<SignalAction>> {
    let (tx, rx) = mpsc::channel(4);

    let mut usr1 = signal(SignalKind::user_defined1())?;
    let pause_tx = tx.clone();
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            if pause_tx.send(SignalAction::Pause).await.is_err() {
                break;
            }
        }
    });

    let mut usr2 = signal(SignalKind::user_defined2())?;
    tokio::spawn(async move {
        while usr2.recv().await.is_some() {
            if tx.send(SignalAction::Stop).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}
