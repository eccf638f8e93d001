//! Process-wide Ctrl-C handling.
//!
//! A single listener task owns the SIGINT handler for the whole session and
//! forwards every press into a channel, so presses that arrive while a card
//! operation runs are kept until the prompt gets to them.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

/// Ctrl-C presses not yet handled by the prompt.
#[derive(Debug)]
pub struct Interrupts {
    rx: UnboundedReceiver<()>,
}

impl Interrupts {
    /// Install the Ctrl-C listener on the current runtime.
    pub fn listen() -> Self {
        let (tx, interrupts) = Self::channel();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl-C handler unavailable: {}", e);
                    break;
                }
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        interrupts
    }

    /// An unconnected channel; presses are sent by hand.
    pub fn channel() -> (UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next press. Never resolves once the listener is gone.
    pub async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    /// Consume presses that arrived while nobody was waiting.
    ///
    /// Returns `true` if there was at least one.
    pub fn take_pending(&mut self) -> bool {
        let mut pressed = false;
        while self.rx.try_recv().is_ok() {
            pressed = true;
        }
        pressed
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_pending_presses_are_drained_once() {
        let (tx, mut interrupts) = Interrupts::channel();
        assert!(!interrupts.take_pending());

        tx.send(()).unwrap();
        tx.send(()).unwrap();
        assert!(interrupts.take_pending());
        assert!(!interrupts.take_pending());
    }

    #[tokio::test]
    async fn test_recv_sees_press() {
        let (tx, mut interrupts) = Interrupts::channel();
        tx.send(()).unwrap();

        interrupts.recv().await;
        assert!(!interrupts.take_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_listener_never_fires() {
        let (tx, mut interrupts) = Interrupts::channel();
        drop(tx);

        let waited = tokio::time::timeout(Duration::from_secs(60), interrupts.recv()).await;
        assert!(waited.is_err());
    }
}
