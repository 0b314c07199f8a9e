//! Cancellation-aware blocking channel operations.
//!
//! Every blocking exchange in a running simulation goes through
//! [`send_until`] or [`recv_until`]: the operation is retried with a
//! short timeout and the [`CancellationToken`] is re-checked between
//! attempts, so no task can stay blocked past shutdown.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::cancel::CancellationToken;
use crate::error::RendezvousError;

/// Retry granularity used by the reference tuning.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Send `msg`, retrying every `interval` until the peer takes it.
///
/// Returns [`RendezvousError::Cancelled`] if `token` fires first (it is
/// checked before the first attempt) and
/// [`RendezvousError::Disconnected`] if every receiver is gone.
pub fn send_until<T>(
    tx: &Sender<T>,
    msg: T,
    token: &CancellationToken,
    interval: Duration,
) -> Result<(), RendezvousError> {
    let mut msg = msg;
    loop {
        if token.is_cancelled() {
            return Err(RendezvousError::Cancelled);
        }
        match tx.send_timeout(msg, interval) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => msg = back,
            Err(SendTimeoutError::Disconnected(_)) => return Err(RendezvousError::Disconnected),
        }
    }
}

/// Receive one value, retrying every `interval` until one arrives.
///
/// Same failure semantics as [`send_until`].
pub fn recv_until<T>(
    rx: &Receiver<T>,
    token: &CancellationToken,
    interval: Duration,
) -> Result<T, RendezvousError> {
    loop {
        if token.is_cancelled() {
            return Err(RendezvousError::Cancelled);
        }
        match rx.recv_timeout(interval) {
            Ok(v) => return Ok(v),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Err(RendezvousError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;
    use std::time::Instant;

    const TICK: Duration = Duration::from_millis(5);

    #[test]
    fn send_meets_receiver() {
        let (tx, rx) = bounded::<u32>(0);
        let token = CancellationToken::new();
        let peer = thread::spawn(move || rx.recv().unwrap());
        send_until(&tx, 7, &token, TICK).unwrap();
        assert_eq!(peer.join().unwrap(), 7);
    }

    #[test]
    fn recv_meets_sender() {
        let (tx, rx) = bounded::<u32>(0);
        let token = CancellationToken::new();
        let peer = thread::spawn(move || tx.send(9).unwrap());
        assert_eq!(recv_until(&rx, &token, TICK), Ok(9));
        peer.join().unwrap();
    }

    #[test]
    fn send_gives_up_after_cancel() {
        let (tx, _rx) = bounded::<u32>(0);
        let token = CancellationToken::new();
        let canceller = {
            let t = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                t.cancel();
            })
        };
        let start = Instant::now();
        assert_eq!(
            send_until(&tx, 1, &token, TICK),
            Err(RendezvousError::Cancelled)
        );
        assert!(start.elapsed() < Duration::from_secs(1));
        canceller.join().unwrap();
    }

    #[test]
    fn pre_cancelled_token_never_attempts() {
        let (tx, rx) = bounded::<u32>(1);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            send_until(&tx, 1, &token, TICK),
            Err(RendezvousError::Cancelled)
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(
            recv_until(&rx, &token, TICK),
            Err(RendezvousError::Cancelled)
        );
    }

    #[test]
    fn dropped_peer_reports_disconnect() {
        let token = CancellationToken::new();
        let (tx, rx) = bounded::<u32>(0);
        drop(rx);
        assert_eq!(
            send_until(&tx, 1, &token, TICK),
            Err(RendezvousError::Disconnected)
        );

        let (tx, rx) = bounded::<u32>(0);
        drop(tx);
        assert_eq!(
            recv_until(&rx, &token, TICK),
            Err(RendezvousError::Disconnected)
        );
    }
}
