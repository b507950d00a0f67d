use chrono::{DateTime, Utc};

use pairdesk_types::api::{BlocklistResponse, SessionsResponse};
use pairdesk_types::models::{BlockedUser, ConnectionStatus, Session};

/// The bot service does not record why a number was blocked.
pub const DEFAULT_BLOCK_REASON: &str = "Blocked by admin";

/// One session per `active` number, in upstream order.
///
/// The upstream carries no timestamps: `created_at` is stamped with `now`,
/// as is `last_seen` for connected sessions. Disconnected ones have none.
pub fn transform_sessions(resp: &SessionsResponse, now: DateTime<Utc>) -> Vec<Session> {
    resp.active
        .iter()
        .map(|number| {
            let connected = resp.status.get(number).is_some_and(|s| s.connected);
            Session {
                id: number.clone(),
                phone_number: number.clone(),
                status: if connected {
                    ConnectionStatus::Connected
                } else {
                    ConnectionStatus::Disconnected
                },
                pairing_code: None,
                last_seen: connected.then_some(now),
                created_at: now,
            }
        })
        .collect()
}

/// One record per number whose entry is `blocked: true`, ordered by number.
pub fn transform_blocklist(resp: &BlocklistResponse, now: DateTime<Utc>) -> Vec<BlockedUser> {
    resp.iter()
        .filter(|(_, entry)| entry.blocked)
        .map(|(number, _)| BlockedUser {
            id: number.clone(),
            phone_number: number.clone(),
            blocked_at: now,
            reason: Some(DEFAULT_BLOCK_REASON.into()),
        })
        .collect()
}
