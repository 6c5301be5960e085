//! Application state management
//!
//! Holds the current team data snapshot and the liaison cache shared by
//! every command handler. Snapshots are immutable; a refresh swaps in a new
//! `Arc<TeamData>` so in-flight queries keep reading the one they started with.

use crate::error::GovernanceResult;
use crate::governance::{LiaisonCache, TeamData};
use crate::source::TeamSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Governance state shared across all handlers
pub struct GovernanceState {
    /// Current snapshot, replaced wholesale on refresh
    team_data: RwLock<Arc<TeamData>>,

    /// Serializes refreshes
    refresh_lock: Mutex<()>,

    /// Where the team document comes from
    source: Arc<dyn TeamSource>,
    location: String,

    /// Release liaison memo
    liaisons: LiaisonCache,
}

impl GovernanceState {
    /// Create state around an already-fetched snapshot
    pub fn new(
        team_data: TeamData,
        source: Arc<dyn TeamSource>,
        location: impl Into<String>,
        liaisons: LiaisonCache,
    ) -> Self {
        Self {
            team_data: RwLock::new(Arc::new(team_data)),
            refresh_lock: Mutex::new(()),
            source,
            location: location.into(),
            liaisons,
        }
    }

    /// Fetch the initial snapshot and build the state
    pub async fn load(
        source: Arc<dyn TeamSource>,
        location: impl Into<String>,
        liaisons: LiaisonCache,
    ) -> GovernanceResult<Self> {
        let location = location.into();
        let team_data = source.fetch_team_data(&location).await?;
        Ok(Self::new(team_data, source, location, liaisons))
    }

    /// The snapshot current at the time of the call
    pub async fn snapshot(&self) -> Arc<TeamData> {
        Arc::clone(&*self.team_data.read().await)
    }

    pub fn liaisons(&self) -> &LiaisonCache {
        &self.liaisons
    }

    /// Fetch the team document again and swap it in.
    ///
    /// On failure the previous snapshot stays in place. Returns the number
    /// of teams in the new snapshot.
    pub async fn refresh(&self) -> GovernanceResult<usize> {
        let _guard = self.refresh_lock.lock().await;
        let team_data = self.source.fetch_team_data(&self.location).await?;
        let teams = team_data.len();
        *self.team_data.write().await = Arc::new(team_data);
        info!("Refreshed team data: {} teams", teams);
        Ok(teams)
    }
}

/// Type alias for shared state
pub type SharedState = Arc<GovernanceState>;

/// Refresh the snapshot every `interval` until the task is aborted
pub fn spawn_refresh_task(state: SharedState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately; startup already fetched
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = state.refresh().await {
                warn!("Team data refresh failed, keeping previous snapshot: {}", e);
            }
        }
    })
}
