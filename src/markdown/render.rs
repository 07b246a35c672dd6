use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::model::issue::{Issue, StateType};

/// Render a checklist document for a list of issues.
///
/// Issues are partitioned into the five state-type buckets and emitted in
/// fixed bucket order (backlog, unstarted, started, completed, canceled) so
/// regenerated files diff cleanly. Empty buckets are omitted. Apart from the
/// timestamp line, output is byte-identical for the same issue list.
pub fn render_document(title: &str, issues: &[Issue], description: &str) -> String {
    let mut lines: Vec<String> = vec![
        format!("# {title}"),
        String::new(),
        format!("*Generated: {}*", Local::now().format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ];

    if !description.is_empty() {
        lines.push(description.to_string());
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());

    for section in StateType::SECTIONS {
        let bucket: Vec<&Issue> = issues.iter().filter(|i| i.bucket() == section).collect();
        if bucket.is_empty() {
            continue;
        }

        lines.push(format!("## {}", section.heading()));
        lines.push(String::new());

        for issue in bucket {
            lines.push(render_line(issue));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// One checklist line. The checkbox reflects bucket membership (completed or
/// canceled means checked), and the trailing comment embeds the issue's
/// opaque id — the only field the parser trusts on the way back.
fn render_line(issue: &Issue) -> String {
    let checkbox = if issue.is_done() { "- [x]" } else { "- [ ]" };
    let state_name = issue
        .state
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or("Unknown");
    format!(
        "{checkbox} **{}**: {} *[{state_name}]* <!-- id:{} -->",
        issue.identifier, issue.title, issue.id
    )
}

/// Lowercase, then replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn write_my_issues(output_dir: &Path, issues: &[Issue]) -> Result<PathBuf> {
    let path = output_dir.join("my-issues.md");
    let content = render_document("My Issues", issues, "All issues assigned to me");
    write_file(&path, &content)?;
    Ok(path)
}

pub fn write_team_issues(output_dir: &Path, team_name: &str, issues: &[Issue]) -> Result<PathBuf> {
    let path = output_dir.join(format!("issues-{}.md", sanitize_name(team_name)));
    let content = render_document(
        &format!("Issues: {team_name}"),
        issues,
        &format!("All issues for team {team_name}"),
    );
    write_file(&path, &content)?;
    Ok(path)
}

pub fn write_project_issues(
    output_dir: &Path,
    project_name: &str,
    issues: &[Issue],
) -> Result<PathBuf> {
    let path = output_dir.join(format!("issues-{}.md", sanitize_name(project_name)));
    let content = render_document(
        &format!("Issues: {project_name}"),
        issues,
        &format!("All issues for project {project_name}"),
    );
    write_file(&path, &content)?;
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))
}
