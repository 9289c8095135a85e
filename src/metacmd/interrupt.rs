// Interrupt Scope
// Cancellation token tied to Ctrl-C for the duration of one command

use super::MetaError;
use crate::db::traits::DatabaseError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancellable scope: cancelled by the parent token or by an interrupt signal
/// received while [`InterruptScope::run`] is driving its work.
///
/// The work is always polled to completion. Cancelling only fires the token;
/// the backend call observes it, stops the statement and reports
/// [`DatabaseError::Cancelled`], so the connection is free again on return.
pub struct InterruptScope {
    token: CancellationToken,
}

impl InterruptScope {
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    /// Token handed to the work running inside the scope
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Drive `work` to completion, cancelling the scope token on Ctrl-C
    pub async fn run<T>(&self, work: impl Future<Output = Result<T, DatabaseError>>) -> Result<T, MetaError> {
        tokio::pin!(work);
        let signal = tokio::signal::ctrl_c();
        tokio::pin!(signal);
        let mut listening = true;

        let result = loop {
            tokio::select! {
                result = &mut work => break result,
                received = &mut signal, if listening => {
                    listening = false;
                    if received.is_ok() {
                        debug!("interrupt received");
                        self.token.cancel();
                    }
                }
            }
        };
        result.map_err(MetaError::from)
    }
}
