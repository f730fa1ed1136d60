// Panic isolation for queue items
use crate::domain::{ItemError, ItemOutcome, QueueItem};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Poll an item inside the drain future, turning a panic into
/// `ItemError::Panicked` instead of unwinding through the drain loop.
///
/// The item is owned by the caller's future: dropping the drain drops the
/// item with it, so nothing keeps running behind an interrupted drain.
pub(super) async fn execute_isolated(seq: u64, item: QueueItem) -> ItemOutcome {
    match AssertUnwindSafe(item.into_future()).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let panic_msg = panic_message(payload);
            error!(seq, panic_msg = %panic_msg, "Queue item panicked");
            Err(ItemError::Panicked(panic_msg))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
