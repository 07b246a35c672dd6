use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::markdown::parse::{read_intents, IssueIntent};
use crate::model::issue::StateType;
use crate::tracker::IssueTracker;

/// Compares parsed checkbox intent against live remote state and issues the
/// minimal set of state transitions. Stateless across cycles: every call
/// fetches current remote truth, so a prior sync leaves nothing to
/// invalidate.
pub struct Reconciler {
    tracker: Option<Arc<dyn IssueTracker>>,
}

impl Reconciler {
    pub fn new(tracker: Option<Arc<dyn IssueTracker>>) -> Self {
        Self { tracker }
    }

    /// Parse a markdown file and push its checkbox state to the tracker.
    /// Returns the number of issues actually transitioned.
    pub async fn sync_file(&self, path: &Path) -> Result<usize> {
        let intents = read_intents(path);
        self.apply(&intents).await
    }

    /// Reconcile a batch of intents. A failure on one issue is logged and
    /// skipped; the rest of the batch still runs. Fails fast if no tracker
    /// is attached.
    pub async fn apply(&self, intents: &[IssueIntent]) -> Result<usize> {
        let tracker = self.tracker.as_ref().ok_or(SyncError::NotConfigured)?;

        let mut updated = 0;
        for intent in intents {
            match self.sync_one(tracker.as_ref(), intent).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => warn!(issue_id = %intent.id, "failed to sync issue: {e:#}"),
            }
        }
        if updated > 0 {
            info!(count = updated, "synced issue transitions");
        }
        Ok(updated)
    }

    /// Reconcile one issue. Returns true if a transition was applied.
    async fn sync_one(&self, tracker: &dyn IssueTracker, intent: &IssueIntent) -> Result<bool> {
        let issue = tracker.get_issue(&intent.id).await?;
        if intent.completed == issue.is_done() {
            return Ok(false);
        }

        let Some(team) = issue.team.as_ref() else {
            debug!(issue_id = %intent.id, "issue has no team, skipping");
            return Ok(false);
        };

        let wanted = if intent.completed {
            StateType::Completed
        } else {
            StateType::Unstarted
        };

        // First state of the wanted type in the team's list order. If a team
        // defines several, the choice is order-dependent; that tie-break is
        // a documented policy, not a uniqueness guarantee.
        let states = tracker.get_workflow_states(&team.id).await?;
        let Some(target) = states.iter().find(|s| s.state_type == wanted) else {
            debug!(
                issue_id = %intent.id,
                team_id = %team.id,
                "team has no {wanted:?} state, skipping"
            );
            return Ok(false);
        };

        tracker.update_issue_state(&intent.id, &target.id).await?;
        Ok(true)
    }
}
