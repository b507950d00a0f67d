use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use pairdesk_types::models::{BlockedUser, ConnectionStatus, Session};

use crate::api::{ApiClient, ClientError};
use crate::cache::{Query, QueryKey, QueryPolicy};
use crate::outcome::{
    ActionOutcome, AdminAction, Notice, PairOutcome, Severity, classify_pair, pair_failure_notice,
};
use crate::phone::{InputError, clean_number, require_number};
use crate::transform::{transform_blocklist, transform_sessions};

/// Reachability of the bot service as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiStatus {
    #[default]
    Checking,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_sessions: usize,
    pub connected: usize,
    pub pairing: usize,
    pub blocked: usize,
}

impl DashboardStats {
    pub fn from_snapshots(sessions: &[Session], blocked: &[BlockedUser]) -> Self {
        let count = |status: ConnectionStatus| sessions.iter().filter(|s| s.status == status).count();
        Self {
            total_sessions: sessions.len(),
            connected: count(ConnectionStatus::Connected),
            pairing: count(ConnectionStatus::Pairing),
            blocked: blocked.len(),
        }
    }
}

/// Read queries and admin mutations over one [`ApiClient`].
///
/// Mutations are sent once and invalidate the read queries they affect:
/// pair and delete touch sessions, block touches both, unblock touches the
/// blocklist.
pub struct Dashboard {
    client: ApiClient,
    sessions: Query<Session>,
    blocklist: Query<BlockedUser>,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        Self::with_policies(client, QueryPolicy::sessions(), QueryPolicy::blocklist())
    }

    pub fn with_policies(client: ApiClient, sessions: QueryPolicy, blocklist: QueryPolicy) -> Self {
        Self {
            client,
            sessions: Query::new(QueryKey::Sessions, sessions),
            blocklist: Query::new(QueryKey::Blocklist, blocklist),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn sessions_query(&self) -> &Query<Session> {
        &self.sessions
    }

    pub fn blocklist_query(&self) -> &Query<BlockedUser> {
        &self.blocklist
    }

    // -- Reads --

    pub async fn sessions(&self) -> Vec<Session> {
        self.sessions.fetch(move || self.load_sessions()).await
    }

    pub async fn blocklist(&self) -> Vec<BlockedUser> {
        self.blocklist.fetch(move || self.load_blocklist()).await
    }

    pub async fn refresh(&self, key: QueryKey) -> usize {
        match key {
            QueryKey::Sessions => self.sessions.refresh(move || self.load_sessions()).await.len(),
            QueryKey::Blocklist => self.blocklist.refresh(move || self.load_blocklist()).await.len(),
        }
    }

    /// Marks `key` stale without waiting for any load in flight.
    pub fn invalidate(&self, key: QueryKey) {
        match key {
            QueryKey::Sessions => self.sessions.invalidate(),
            QueryKey::Blocklist => self.blocklist.invalidate(),
        }
    }

    async fn load_sessions(&self) -> Result<Vec<Session>, ClientError> {
        let resp = self.client.sessions().await?;
        Ok(transform_sessions(&resp, Utc::now()))
    }

    async fn load_blocklist(&self) -> Result<Vec<BlockedUser>, ClientError> {
        let resp = self.client.blocklist().await?;
        Ok(transform_blocklist(&resp, Utc::now()))
    }

    /// Counts over the last loaded snapshots. Does not hit the network.
    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_snapshots(&self.sessions.snapshot(), &self.blocklist.snapshot())
    }

    /// Probes the sessions endpoint.
    pub async fn check_status(&self) -> ApiStatus {
        match self.client.sessions().await {
            Ok(_) => ApiStatus::Connected,
            Err(e) => {
                warn!("API status check failed: {}", e);
                ApiStatus::Disconnected
            }
        }
    }

    /// Whether `phone_number` is on the blocklist. Lookup failures count as not banned.
    pub async fn is_banned(&self, phone_number: &str) -> bool {
        let number = clean_number(phone_number);
        match self.client.blocklist().await {
            Ok(list) => list.get(&number).is_some_and(|entry| entry.blocked),
            Err(e) => {
                error!("Error checking ban status for {}: {}", number, e);
                false
            }
        }
    }

    // -- Mutations --

    pub async fn pair(&self, phone_number: &str) -> Result<PairOutcome, ClientError> {
        if phone_number.trim().is_empty() {
            return Err(InputError::Empty.into());
        }

        match self.client.pair_number(phone_number.trim()).await {
            Ok(resp) => {
                let outcome = classify_pair(&resp);
                match outcome.notice() {
                    Some(notice) => log_notice(&notice),
                    None => warn!("Unrecognized pairing response for {}", resp.number),
                }
                self.invalidate(QueryKey::Sessions);
                Ok(outcome)
            }
            Err(e) => {
                log_notice(&pair_failure_notice(&e));
                Err(e)
            }
        }
    }

    /// Mutations only require a non-empty number; the admin form's length
    /// rule belongs to [`validate_number`](crate::phone::validate_number) at the input site.
    pub async fn block(&self, phone_number: &str) -> Result<ActionOutcome, ClientError> {
        let number = require_number(phone_number)?;
        self.run_action(AdminAction::Block, &number).await
    }

    pub async fn unblock(&self, phone_number: &str) -> Result<ActionOutcome, ClientError> {
        let number = require_number(phone_number)?;
        self.run_action(AdminAction::Unblock, &number).await
    }

    pub async fn delete_session(&self, phone_number: &str) -> Result<ActionOutcome, ClientError> {
        let number = require_number(phone_number)?;
        self.run_action(AdminAction::DeleteSession, &number).await
    }

    async fn run_action(&self, action: AdminAction, number: &str) -> Result<ActionOutcome, ClientError> {
        let result = match action {
            AdminAction::Block => self.client.block_user(number).await,
            AdminAction::Unblock => self.client.unblock_user(number).await,
            AdminAction::DeleteSession => self.client.delete_session(number).await,
        };

        match result {
            Ok(resp) => {
                let outcome = action.outcome(number, &resp);
                log_notice(&action.notice(&outcome));
                for key in invalidated_by(action) {
                    self.invalidate(*key);
                }
                Ok(outcome)
            }
            Err(e) => {
                log_notice(&action.failure_notice(&e));
                Err(e)
            }
        }
    }

    // -- Polling --

    /// Spawns one refresh loop per read query. Loops stop when the returned
    /// handles are dropped.
    pub fn spawn_polling(self: &Arc<Self>) -> PollHandles {
        let mut handles = Vec::new();
        for key in [QueryKey::Sessions, QueryKey::Blocklist] {
            let period = match key {
                QueryKey::Sessions => self.sessions.policy().refetch_interval,
                QueryKey::Blocklist => self.blocklist.policy().refetch_interval,
            };
            if period.is_zero() {
                continue;
            }

            let dashboard = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    let count = dashboard.refresh(key).await;
                    debug!("Polled {}: {} records", key, count);
                }
            }));
            info!("Polling {} every {}s", key, period.as_secs_f64());
        }
        PollHandles { handles }
    }
}

fn invalidated_by(action: AdminAction) -> &'static [QueryKey] {
    match action {
        AdminAction::Block => &[QueryKey::Sessions, QueryKey::Blocklist],
        AdminAction::Unblock => &[QueryKey::Blocklist],
        AdminAction::DeleteSession => &[QueryKey::Sessions],
    }
}

fn log_notice(notice: &Notice) {
    match notice.severity {
        Severity::Info => info!("{}: {}", notice.title, notice.description),
        Severity::Destructive => warn!("{}: {}", notice.title, notice.description),
    }
}

/// Background poll tasks. Aborted on drop.
pub struct PollHandles {
    handles: Vec<JoinHandle<()>>,
}

impl PollHandles {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for PollHandles {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
