pub mod linear;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::issue::{Issue, ProjectRef, TeamRef, UserRef, WorkflowState};

/// Capability interface over the remote tracker. The sync core only talks to
/// this trait; `LinearClient` is the production implementation.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_viewer(&self) -> Result<UserRef>;
    async fn get_teams(&self) -> Result<Vec<TeamRef>>;
    async fn get_team_projects(&self, team_id: &str) -> Result<Vec<ProjectRef>>;
    async fn get_my_issues(&self, limit: u32) -> Result<Vec<Issue>>;
    async fn get_team_issues(&self, team_id: &str, limit: u32) -> Result<Vec<Issue>>;
    async fn get_project_issues(&self, project_id: &str, limit: u32) -> Result<Vec<Issue>>;
    async fn get_issue(&self, issue_id: &str) -> Result<Issue>;
    async fn get_workflow_states(&self, team_id: &str) -> Result<Vec<WorkflowState>>;
    async fn update_issue_state(&self, issue_id: &str, state_id: &str) -> Result<Issue>;
    async fn create_issue(
        &self,
        team_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Issue>;
}
