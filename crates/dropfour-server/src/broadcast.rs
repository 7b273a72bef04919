//! Fan-out of one message to every participant of a session.

use std::sync::Arc;

use dropfour_core::{ServerMessage, SessionId};
use tracing::{debug, warn};

use crate::participant::Participant;

/// Send `message` to each recipient independently.
///
/// The frame is serialized once. A failed send is logged and skipped; the
/// recipient stays registered until its own connection closes. Returns the
/// number of recipients the frame was queued for.
pub fn broadcast<'a, I>(session_id: &SessionId, recipients: I, message: &ServerMessage) -> usize
where
    I: IntoIterator<Item = &'a Arc<Participant>>,
{
    let frame = Arc::new(message.to_json());
    let mut delivered = 0;
    let mut failed = 0;
    for participant in recipients {
        if participant.send(Arc::clone(&frame)) {
            delivered += 1;
        } else {
            failed += 1;
            warn!(
                %session_id,
                conn_id = %participant.id,
                kind = message.kind(),
                "failed to queue message for participant"
            );
        }
    }
    debug!(%session_id, kind = message.kind(), delivered, failed, "broadcast");
    delivered
}
