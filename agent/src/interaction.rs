use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A user gesture that allows audio to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction;

/// Subscribe to the first Enter keypress on stdin.
pub fn spawn_stdin_listener(tx: mpsc::Sender<Interaction>) -> JoinHandle<()> {
    tokio::spawn(listen_once(tokio::io::stdin(), tx))
}

/// Wait for one line on `reader`, send a single [`Interaction`] and return.
///
/// Returning drops `tx`, so the receiver sees the subscription end right after
/// the event.
pub async fn listen_once<R>(reader: R, tx: mpsc::Sender<Interaction>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    match lines.next_line().await {
        Ok(Some(_)) => {
            info!("user interaction received");
            if tx.send(Interaction).await.is_err() {
                debug!("loop already stopped, interaction dropped");
            }
        }
        Ok(None) => {
            warn!("stdin closed before any interaction; audio stays locked");
        }
        Err(e) => {
            warn!(error = %e, "failed to read stdin; audio stays locked");
        }
    }
}
