use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Debounced value channel: only the latest submitted value is emitted, and
/// only after no newer value arrives for `delay`. A zero delay bypasses the
/// timer entirely and emits synchronously.
///
/// Dropping the `Debouncer` flushes any pending value before the output
/// channel closes.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

pub fn channel<T: Send + 'static>(delay: Duration) -> (Debouncer<T>, mpsc::UnboundedReceiver<T>) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    if delay.is_zero() {
        return (Debouncer { tx: out_tx }, out_rx);
    }

    let (in_tx, mut in_rx) = mpsc::unbounded_channel::<T>();
    tokio::spawn(async move {
        let mut pending: Option<T> = None;
        loop {
            match pending.take() {
                None => match in_rx.recv().await {
                    Some(value) => pending = Some(value),
                    None => break,
                },
                Some(value) => {
                    tokio::select! {
                        next = in_rx.recv() => match next {
                            // A newer value cancels the pending emission
                            Some(next) => pending = Some(next),
                            None => {
                                let _ = out_tx.send(value);
                                break;
                            }
                        },
                        _ = sleep(delay) => {
                            let _ = out_tx.send(value);
                        }
                    }
                }
            }
        }
    });

    (Debouncer { tx: in_tx }, out_rx)
}

impl<T> Debouncer<T> {
    pub fn submit(&self, value: T) -> Result<()> {
        self.tx
            .send(value)
            .map_err(|_| anyhow!("debounce receiver dropped"))
    }
}
