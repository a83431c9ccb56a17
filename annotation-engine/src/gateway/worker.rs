use std::thread;

use async_channel::{Receiver, TryRecvError};

use super::{GatewayError, GatewayResult};

/// A blocking gateway call running on its own thread.
///
/// Each call gets a dedicated worker, so a request stuck until its timeout
/// holds up only whoever is waiting on this handle. Systems check the handle
/// once per frame with [`poll`](Self::poll).
pub struct PendingCall<T> {
    reply: Receiver<GatewayResult<T>>,
}

impl<T: Send + 'static> PendingCall<T> {
    pub fn spawn(
        name: impl Into<String>,
        call: impl FnOnce() -> GatewayResult<T> + Send + 'static,
    ) -> Self {
        let (sender, reply) = async_channel::bounded(1);
        let worker_sender = sender.clone();

        let spawned = thread::Builder::new().name(name.into()).spawn(move || {
            // Nobody is listening once the owning entity is gone.
            worker_sender.send_blocking(call()).ok();
        });

        if let Err(error) = spawned {
            sender
                .try_send(Err(GatewayError::Transport(format!(
                    "could not start gateway worker: {error}"
                ))))
                .ok();
        }

        Self { reply }
    }
}

impl<T> PendingCall<T> {
    /// The reply, once the worker has finished.
    pub fn poll(&self) -> Option<GatewayResult<T>> {
        match self.reply.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(GatewayError::Transport(
                "gateway worker exited without a reply".to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for<T>(call: &PendingCall<T>) -> GatewayResult<T> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = call.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "gateway worker never replied");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn reply_is_delivered_once_ready() {
        let call = PendingCall::spawn("list", || Ok(vec![1, 2, 3]));
        assert_eq!(wait_for(&call), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn stalled_call_does_not_hold_up_another() {
        let (release, gate) = async_channel::bounded::<()>(1);
        let stalled = PendingCall::spawn("stalled", move || {
            gate.recv_blocking().ok();
            Ok("created")
        });
        let quick = PendingCall::spawn("quick", || Ok("listed"));

        assert_eq!(wait_for(&quick), Ok("listed"));
        assert!(stalled.poll().is_none());

        release.send_blocking(()).unwrap();
        assert_eq!(wait_for(&stalled), Ok("created"));
    }

    #[test]
    fn worker_that_dies_reports_transport_failure() {
        let call: PendingCall<u8> = PendingCall::spawn("doomed", || panic!("worker died"));
        assert!(matches!(wait_for(&call), Err(GatewayError::Transport(_))));
    }
}
