//! Outbound notification seam.
//!
//! Delivery is fire-and-forget: the service logs a failure and moves on; a
//! notification error never rolls back the request write that triggered it.

use crate::request::Request;

pub trait Notifier: Send + Sync {
    fn request_created(&self, request: &Request) -> anyhow::Result<()>;
    fn status_changed(&self, request: &Request) -> anyhow::Result<()>;
}

/// Default collaborator: records the event in the log and nothing else.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn request_created(&self, request: &Request) -> anyhow::Result<()> {
        tracing::info!(
            "request created: code={} listing={}",
            request.request_code,
            request.listing_id
        );
        Ok(())
    }

    fn status_changed(&self, request: &Request) -> anyhow::Result<()> {
        tracing::info!(
            "request status changed: code={} status={}",
            request.request_code,
            request.status
        );
        Ok(())
    }
}
