use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a workflow state. Linear scopes states to a team, but every
/// state belongs to exactly one of these five canonical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Canceled,
    /// Anything the API returns that we don't recognize. Rendered into the
    /// unstarted bucket.
    #[serde(other)]
    Unknown,
}

impl StateType {
    /// Section order used when rendering markdown. Fixed so regenerated
    /// documents diff cleanly.
    pub const SECTIONS: [StateType; 5] = [
        StateType::Backlog,
        StateType::Unstarted,
        StateType::Started,
        StateType::Completed,
        StateType::Canceled,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            StateType::Backlog => "Backlog",
            StateType::Unstarted | StateType::Unknown => "Unstarted",
            StateType::Started => "Started",
            StateType::Completed => "Completed",
            StateType::Canceled => "Canceled",
        }
    }

    /// Completed and canceled issues both render as checked boxes.
    pub fn is_done(&self) -> bool {
        matches!(self, StateType::Completed | StateType::Canceled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub state_type: StateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Read-mostly snapshot of a remote issue. `id` is the opaque UUID used as
/// the join key for every sync operation; `identifier` is the human-readable
/// code (e.g. "ENG-123") and is display-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<WorkflowState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Bucket the issue belongs to when rendering. Issues without a state,
    /// or with a state type we don't recognize, fall back to unstarted.
    pub fn bucket(&self) -> StateType {
        match self.state.as_ref().map(|s| s.state_type) {
            Some(StateType::Unknown) | None => StateType::Unstarted,
            Some(t) => t,
        }
    }

    /// Whether the issue's current remote state counts as completed for
    /// checkbox purposes.
    pub fn is_done(&self) -> bool {
        self.state
            .as_ref()
            .map(|s| s.state_type.is_done())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_type_deserializes_lowercase() {
        let t: StateType = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(t, StateType::Completed);
    }

    #[test]
    fn unknown_state_type_falls_back() {
        let t: StateType = serde_json::from_str("\"triage\"").unwrap();
        assert_eq!(t, StateType::Unknown);
    }

    #[test]
    fn issue_without_state_buckets_as_unstarted() {
        let issue: Issue = serde_json::from_str(
            r#"{"id":"abc","identifier":"ENG-1","title":"Fix bug"}"#,
        )
        .unwrap();
        assert_eq!(issue.bucket(), StateType::Unstarted);
        assert!(!issue.is_done());
    }

    #[test]
    fn canceled_counts_as_done() {
        let issue: Issue = serde_json::from_str(
            r#"{"id":"abc","identifier":"ENG-1","title":"Fix bug",
                "state":{"id":"s1","name":"Canceled","type":"canceled"}}"#,
        )
        .unwrap();
        assert_eq!(issue.bucket(), StateType::Canceled);
        assert!(issue.is_done());
    }
}
