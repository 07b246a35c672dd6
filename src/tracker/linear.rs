use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::IssueTracker;
use crate::error::SyncError;
use crate::model::issue::{Issue, ProjectRef, TeamRef, UserRef, WorkflowState};

const API_URL: &str = "https://api.linear.app/graphql";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LinearClient {
    api_key: String,
    client: reqwest::Client,
}

impl LinearClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(CALL_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// POST a GraphQL document and deserialize the `data` payload. A non-2xx
    /// status and a GraphQL `errors` array are both surfaced as the same
    /// transport failure.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let body = json!({ "query": query, "variables": variables });
        let resp = self
            .client
            .post(API_URL)
            .header("Authorization", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Linear API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SyncError::Transport(format!("{status} - {text}")).into());
        }

        let envelope: GqlEnvelope = resp
            .json()
            .await
            .context("Failed to parse Linear response")?;

        if let Some(errors) = envelope.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(SyncError::Transport(messages.join("; ")).into());
        }

        let data = envelope
            .data
            .ok_or_else(|| SyncError::Transport("no data in response".into()))?;
        serde_json::from_value(data).context("Unexpected shape in Linear response")
    }
}

#[derive(Deserialize)]
struct GqlEnvelope {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GqlError>>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

const ISSUE_FIELDS: &str = r#"
    id
    identifier
    title
    description
    priority
    state { id name type color position }
    assignee { id name }
    team { id name key }
    project { id name }
    createdAt
    updatedAt
"#;

#[async_trait]
impl IssueTracker for LinearClient {
    async fn get_viewer(&self) -> Result<UserRef> {
        #[derive(Deserialize)]
        struct Data {
            viewer: UserRef,
        }
        let data: Data = self
            .execute("query { viewer { id name email } }", json!({}))
            .await?;
        Ok(data.viewer)
    }

    async fn get_teams(&self) -> Result<Vec<TeamRef>> {
        #[derive(Deserialize)]
        struct Data {
            teams: Nodes<TeamRef>,
        }
        let data: Data = self
            .execute("query { teams { nodes { id name key } } }", json!({}))
            .await?;
        Ok(data.teams.nodes)
    }

    async fn get_team_projects(&self, team_id: &str) -> Result<Vec<ProjectRef>> {
        #[derive(Deserialize)]
        struct Data {
            team: Team,
        }
        #[derive(Deserialize)]
        struct Team {
            projects: Nodes<ProjectRef>,
        }
        let query = r#"
            query ($teamId: String!) {
                team(id: $teamId) {
                    projects { nodes { id name } }
                }
            }
        "#;
        let data: Data = self.execute(query, json!({ "teamId": team_id })).await?;
        Ok(data.team.projects.nodes)
    }

    async fn get_my_issues(&self, limit: u32) -> Result<Vec<Issue>> {
        #[derive(Deserialize)]
        struct Data {
            viewer: Viewer,
        }
        #[derive(Deserialize)]
        struct Viewer {
            #[serde(rename = "assignedIssues")]
            assigned_issues: Nodes<Issue>,
        }
        let query = format!(
            r#"
            query ($first: Int!) {{
                viewer {{
                    assignedIssues(first: $first, orderBy: updatedAt) {{
                        nodes {{ {ISSUE_FIELDS} }}
                    }}
                }}
            }}
        "#
        );
        let data: Data = self.execute(&query, json!({ "first": limit })).await?;
        Ok(data.viewer.assigned_issues.nodes)
    }

    async fn get_team_issues(&self, team_id: &str, limit: u32) -> Result<Vec<Issue>> {
        #[derive(Deserialize)]
        struct Data {
            team: Team,
        }
        #[derive(Deserialize)]
        struct Team {
            issues: Nodes<Issue>,
        }
        let query = format!(
            r#"
            query ($teamId: String!, $first: Int!) {{
                team(id: $teamId) {{
                    issues(first: $first, orderBy: updatedAt) {{
                        nodes {{ {ISSUE_FIELDS} }}
                    }}
                }}
            }}
        "#
        );
        let data: Data = self
            .execute(&query, json!({ "teamId": team_id, "first": limit }))
            .await?;
        Ok(data.team.issues.nodes)
    }

    async fn get_project_issues(&self, project_id: &str, limit: u32) -> Result<Vec<Issue>> {
        #[derive(Deserialize)]
        struct Data {
            project: Project,
        }
        #[derive(Deserialize)]
        struct Project {
            issues: Nodes<Issue>,
        }
        let query = format!(
            r#"
            query ($projectId: String!, $first: Int!) {{
                project(id: $projectId) {{
                    issues(first: $first, orderBy: updatedAt) {{
                        nodes {{ {ISSUE_FIELDS} }}
                    }}
                }}
            }}
        "#
        );
        let data: Data = self
            .execute(&query, json!({ "projectId": project_id, "first": limit }))
            .await?;
        Ok(data.project.issues.nodes)
    }

    async fn get_issue(&self, issue_id: &str) -> Result<Issue> {
        #[derive(Deserialize)]
        struct Data {
            issue: Issue,
        }
        let query = format!(
            r#"
            query ($issueId: String!) {{
                issue(id: $issueId) {{ {ISSUE_FIELDS} }}
            }}
        "#
        );
        let data: Data = self.execute(&query, json!({ "issueId": issue_id })).await?;
        Ok(data.issue)
    }

    async fn get_workflow_states(&self, team_id: &str) -> Result<Vec<WorkflowState>> {
        #[derive(Deserialize)]
        struct Data {
            team: Team,
        }
        #[derive(Deserialize)]
        struct Team {
            states: Nodes<WorkflowState>,
        }
        let query = r#"
            query ($teamId: String!) {
                team(id: $teamId) {
                    states { nodes { id name type color position } }
                }
            }
        "#;
        let data: Data = self.execute(query, json!({ "teamId": team_id })).await?;
        Ok(data.team.states.nodes)
    }

    async fn update_issue_state(&self, issue_id: &str, state_id: &str) -> Result<Issue> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "issueUpdate")]
            issue_update: MutationResult,
        }
        let mutation = format!(
            r#"
            mutation ($issueId: String!, $stateId: String!) {{
                issueUpdate(id: $issueId, input: {{ stateId: $stateId }}) {{
                    success
                    issue {{ {ISSUE_FIELDS} }}
                }}
            }}
        "#
        );
        let data: Data = self
            .execute(
                &mutation,
                json!({ "issueId": issue_id, "stateId": state_id }),
            )
            .await?;
        data.issue_update.into_issue("issueUpdate")
    }

    async fn create_issue(
        &self,
        team_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Issue> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "issueCreate")]
            issue_create: MutationResult,
        }
        let mutation = format!(
            r#"
            mutation ($teamId: String!, $title: String!, $description: String) {{
                issueCreate(input: {{ teamId: $teamId, title: $title, description: $description }}) {{
                    success
                    issue {{ {ISSUE_FIELDS} }}
                }}
            }}
        "#
        );
        let data: Data = self
            .execute(
                &mutation,
                json!({
                    "teamId": team_id,
                    "title": title,
                    "description": description.unwrap_or(""),
                }),
            )
            .await?;
        data.issue_create.into_issue("issueCreate")
    }
}

#[derive(Deserialize)]
struct MutationResult {
    success: bool,
    issue: Option<Issue>,
}

impl MutationResult {
    fn into_issue(self, op: &str) -> Result<Issue> {
        if !self.success {
            return Err(SyncError::Transport(format!("{op} reported failure")).into());
        }
        self.issue
            .ok_or_else(|| SyncError::Transport(format!("{op} returned no issue")).into())
    }
}
