// ABOUTME: Periodic expiry sweep terminating idle sessions
// ABOUTME: Takes the same state lock as the router so a sweep never races a transition

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;

use crate::session::SessionStore;
use crate::texts;
use crate::transport::MessageTransport;

/// Run the expiry sweep forever. Every `period`, sessions idle longer than
/// `limit` are removed under the state lock; the expiry notices go out after
/// the lock is released.
pub async fn start_sweeper(
    store: Arc<SessionStore>,
    transport: Arc<dyn MessageTransport>,
    period: StdDuration,
    limit: StdDuration,
) {
    tracing::info!(
        period_secs = period.as_secs(),
        limit_secs = limit.as_secs(),
        "Starting session expiry sweeper"
    );

    let limit = match chrono::Duration::from_std(limit) {
        Ok(limit) => limit,
        Err(e) => {
            tracing::error!(error = %e, "Invalid session limit, sweeper not started");
            return;
        }
    };

    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let expired = match store.lock() {
            Ok(mut state) => state.take_expired(Utc::now(), limit),
            Err(e) => {
                tracing::error!(error = %e, "Sweep skipped");
                continue;
            }
        };

        for (user, session) in expired {
            tracing::info!(
                user = %user,
                channel = %session.business_channel_id,
                "Session expired"
            );
            if let Err(e) = transport
                .send_text(
                    &session.business_channel_id,
                    &user,
                    texts::SESSION_EXPIRED,
                    None,
                )
                .await
            {
                tracing::error!(recipient = %user, error = %e, "Failed to send expiry notice");
            }
        }
    }
}
