//! Request bounding: a per-controller cancellation signal plus a timeout.

use std::{future::Future, time::Duration};

use tokio::sync::watch;

use crate::error::ClientError;

/// Generation counter shared by all requests of one controller. Bumping it
/// cancels everything dispatched before the bump; later requests are
/// unaffected.
#[derive(Debug)]
pub struct Cancellation {
    generation: watch::Sender<u64>,
}

impl Default for Cancellation {
    fn default() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }
}

impl Cancellation {
    pub fn cancel_outstanding(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }

    pub fn token(&self) -> CancelToken {
        let receiver = self.generation.subscribe();
        let generation = *receiver.borrow();
        CancelToken {
            receiver,
            generation,
        }
    }
}

pub struct CancelToken {
    receiver: watch::Receiver<u64>,
    generation: u64,
}

impl CancelToken {
    async fn cancelled(&mut self) {
        let generation = self.generation;
        // A dropped sender means the owning controller is gone; treat as cancelled.
        let _ = self.receiver.wait_for(|current| *current != generation).await;
    }
}

/// Runs one backend request, failing it with `Timeout` or `Cancelled` instead
/// of waiting forever.
pub async fn bounded<T, F>(
    request: F,
    limit: Duration,
    mut token: CancelToken,
) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        result = tokio::time::timeout(limit, request) => {
            result.unwrap_or(Err(ClientError::Timeout(limit)))
        }
        _ = token.cancelled() => Err(ClientError::Cancelled),
    }
}
