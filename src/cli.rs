use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::{self, AppConfig};
use crate::error::SyncError;
use crate::markdown::reconcile::Reconciler;
use crate::markdown::render;
use crate::markdown::watch::FileWatcher;
use crate::tracker::linear::LinearClient;
use crate::tracker::IssueTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate {
        team: Option<String>,
        project: Option<String>,
        limit: u32,
    },
    Sync {
        path: Option<PathBuf>,
    },
    Watch {
        path: Option<PathBuf>,
    },
    Add {
        title: String,
        description: Option<String>,
        team: Option<String>,
    },
    Teams,
    Whoami,
    SetKey {
        key: String,
    },
    Help,
}

const DEFAULT_LIMIT: u32 = 50;

/// Parse CLI arguments into a command. Hand-rolled on purpose: the surface
/// is six subcommands and a handful of flags.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match first.as_str() {
        "generate" => parse_generate(rest),
        "sync" => Ok(Command::Sync {
            path: rest.first().map(PathBuf::from),
        }),
        "watch" => Ok(Command::Watch {
            path: rest.first().map(PathBuf::from),
        }),
        "add" => parse_add(rest),
        "teams" => Ok(Command::Teams),
        "whoami" => Ok(Command::Whoami),
        "set-key" => match rest {
            [key] => Ok(Command::SetKey { key: key.clone() }),
            _ => bail!("Usage: linsync set-key <linear-api-key>"),
        },
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command: {other}. Run `linsync help` for usage."),
    }
}

fn parse_generate(args: &[String]) -> Result<Command> {
    let mut team = None;
    let mut project = None;
    let mut limit = DEFAULT_LIMIT;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--team" => {
                i += 1;
                team = Some(flag_value(args, i, "--team")?);
            }
            "--project" => {
                i += 1;
                project = Some(flag_value(args, i, "--project")?);
            }
            "--limit" => {
                i += 1;
                let raw = flag_value(args, i, "--limit")?;
                limit = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--limit expects a number, got {raw}"))?;
            }
            other => bail!("Unknown flag for generate: {other}"),
        }
        i += 1;
    }

    if team.is_some() && project.is_some() {
        bail!("Pass either --team or --project, not both");
    }

    Ok(Command::Generate {
        team,
        project,
        limit,
    })
}

/// Parse `linsync add` arguments into title / description / team.
///
/// Supported forms:
///   linsync add "My task title"
///   linsync add My task title
///   linsync add "My task" -d "The description"
///   linsync add "My task" --team <team-id>
fn parse_add(args: &[String]) -> Result<Command> {
    if args.is_empty() {
        bail!(
            "Usage: linsync add <title> [-d <description>] [--team <id>]\n\n\
             Examples:\n  linsync add \"Fix the login bug\"\n  \
             linsync add \"Fix the login bug\" -d \"Users can't log in with SSO\""
        );
    }

    let mut title_parts: Vec<String> = Vec::new();
    let mut description = None;
    let mut team = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--desc" | "--description" => {
                i += 1;
                description = Some(flag_value(args, i, "-d/--desc")?);
            }
            "--team" => {
                i += 1;
                team = Some(flag_value(args, i, "--team")?);
            }
            _ => title_parts.push(args[i].clone()),
        }
        i += 1;
    }

    let title = title_parts.join(" ");
    if title.is_empty() {
        bail!("Task title cannot be empty");
    }

    Ok(Command::Add {
        title,
        description,
        team,
    })
}

fn flag_value(args: &[String], index: usize, flag: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Missing value for {flag} flag"))
}

pub fn print_help() {
    println!("linsync — mirror Linear issues into markdown checklists and sync edits back\n");
    println!("USAGE:");
    println!("  linsync generate [--team <id> | --project <id>] [--limit <n>]");
    println!("                    Write a markdown checklist for your issues");
    println!("  linsync sync [<path>]");
    println!("                    One-shot sync of checkbox edits back to Linear");
    println!("  linsync watch [<path>]");
    println!("                    Generate, then watch the file and sync on every edit");
    println!("  linsync add <title> [-d <description>] [--team <id>]");
    println!("                    Create a new issue");
    println!("  linsync teams     List teams you have access to");
    println!("  linsync whoami    Show the authenticated user");
    println!("  linsync set-key <key>");
    println!("                    Store your Linear API key in the config");
    println!();
    println!("Configuration lives in ~/.linsync/config.toml (api_key, markdown.output_dir,");
    println!("markdown.sync_on_edit).");
}

pub async fn run(command: Command) -> Result<()> {
    let config = config::load_config()?;
    match command {
        Command::Generate {
            team,
            project,
            limit,
        } => handle_generate(&config, team, project, limit).await,
        Command::Sync { path } => handle_sync(&config, path).await,
        Command::Watch { path } => handle_watch(&config, path).await,
        Command::Add {
            title,
            description,
            team,
        } => handle_add(&config, &title, description.as_deref(), team).await,
        Command::Teams => handle_teams(&config).await,
        Command::Whoami => handle_whoami(&config).await,
        Command::SetKey { key } => {
            let mut config = config;
            config.api_key = Some(key);
            config::save_config(&config)?;
            println!("API key saved.");
            Ok(())
        }
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

fn make_tracker(config: &AppConfig) -> Option<Arc<dyn IssueTracker>> {
    config
        .api_key
        .as_ref()
        .filter(|key| !key.is_empty())
        .map(|key| Arc::new(LinearClient::new(key.clone())) as Arc<dyn IssueTracker>)
}

fn require_tracker(config: &AppConfig) -> Result<Arc<dyn IssueTracker>> {
    make_tracker(config).ok_or_else(|| SyncError::NotConfigured.into())
}

fn default_file(config: &AppConfig) -> PathBuf {
    config.output_dir().join("my-issues.md")
}

async fn handle_generate(
    config: &AppConfig,
    team: Option<String>,
    project: Option<String>,
    limit: u32,
) -> Result<()> {
    let tracker = require_tracker(config)?;
    let output_dir = config.output_dir();

    let path = if let Some(team_id) = team {
        let issues = tracker.get_team_issues(&team_id, limit).await?;
        let name = tracker
            .get_teams()
            .await
            .ok()
            .and_then(|teams| teams.into_iter().find(|t| t.id == team_id))
            .map(|t| t.name)
            .unwrap_or(team_id);
        render::write_team_issues(&output_dir, &name, &issues)?
    } else if let Some(project_id) = project {
        let issues = tracker.get_project_issues(&project_id, limit).await?;
        let name = resolve_project_name(tracker.as_ref(), &project_id)
            .await
            .unwrap_or(project_id);
        render::write_project_issues(&output_dir, &name, &issues)?
    } else {
        let issues = tracker.get_my_issues(limit).await?;
        render::write_my_issues(&output_dir, &issues)?
    };

    println!("Wrote {}", path.display());
    Ok(())
}

async fn resolve_project_name(tracker: &dyn IssueTracker, project_id: &str) -> Option<String> {
    let teams = tracker.get_teams().await.ok()?;
    for team in teams {
        if let Ok(projects) = tracker.get_team_projects(&team.id).await {
            if let Some(project) = projects.into_iter().find(|p| p.id == project_id) {
                return Some(project.name);
            }
        }
    }
    None
}

async fn handle_sync(config: &AppConfig, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| default_file(config));
    let reconciler = Reconciler::new(make_tracker(config));
    let count = reconciler.sync_file(&path).await?;
    println!("Synced {count} issue(s) from {}", path.display());
    Ok(())
}

async fn handle_watch(config: &AppConfig, path: Option<PathBuf>) -> Result<()> {
    let tracker = require_tracker(config)?;
    let path = match path {
        Some(p) => p,
        None => {
            // No explicit file: regenerate my-issues.md so the watched
            // checklist starts from current remote truth.
            let issues = tracker.get_my_issues(DEFAULT_LIMIT).await?;
            let path = render::write_my_issues(&config.output_dir(), &issues)?;
            println!("Wrote {}", path.display());
            path
        }
    };

    if !config.markdown.sync_on_edit {
        println!("markdown.sync_on_edit is disabled in config; nothing to watch.");
        return Ok(());
    }

    let reconciler = Arc::new(Reconciler::new(Some(tracker)));
    let mut watcher = FileWatcher::new(reconciler, config.markdown.sync_on_edit);
    watcher.watch(
        &path,
        Some(Arc::new(|count| {
            if count > 0 {
                println!("Synced {count} issue(s)");
            }
        })),
    )?;

    if watcher.is_watching() {
        println!("Watching {} — press Ctrl-C to stop", path.display());
    }
    tokio::signal::ctrl_c().await?;
    watcher.unwatch();
    info!("watch stopped");
    Ok(())
}

async fn handle_add(
    config: &AppConfig,
    title: &str,
    description: Option<&str>,
    team: Option<String>,
) -> Result<()> {
    let tracker = require_tracker(config)?;

    let team_id = match team {
        Some(id) => id,
        None => {
            let teams = tracker.get_teams().await?;
            teams
                .into_iter()
                .next()
                .map(|t| t.id)
                .ok_or_else(|| anyhow::anyhow!("No teams available on this workspace"))?
        }
    };

    let issue = tracker.create_issue(&team_id, title, description).await?;
    println!("Created {}: {}", issue.identifier, issue.title);
    Ok(())
}

async fn handle_teams(config: &AppConfig) -> Result<()> {
    let tracker = require_tracker(config)?;
    for team in tracker.get_teams().await? {
        let key = team.key.as_deref().unwrap_or("-");
        println!("{}  {}  ({})", team.id, team.name, key);
    }
    Ok(())
}

async fn handle_whoami(config: &AppConfig) -> Result<()> {
    let tracker = require_tracker(config)?;
    let viewer = tracker.get_viewer().await?;
    match viewer.email {
        Some(email) => println!("{} <{email}>", viewer.name),
        None => println!("{}", viewer.name),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_prints_help() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn unknown_command_fails() {
        let result = parse_args(&args(&["frobnicate"]));
        assert!(result.is_err());
    }

    #[test]
    fn generate_defaults() {
        let cmd = parse_args(&args(&["generate"])).unwrap();
        assert_eq!(
            cmd,
            Command::Generate {
                team: None,
                project: None,
                limit: DEFAULT_LIMIT
            }
        );
    }

    #[test]
    fn generate_with_team_and_limit() {
        let cmd = parse_args(&args(&["generate", "--team", "team-1", "--limit", "10"])).unwrap();
        assert_eq!(
            cmd,
            Command::Generate {
                team: Some("team-1".to_string()),
                project: None,
                limit: 10
            }
        );
    }

    #[test]
    fn generate_rejects_team_and_project_together() {
        let result = parse_args(&args(&["generate", "--team", "a", "--project", "b"]));
        assert!(result.is_err());
    }

    #[test]
    fn generate_rejects_bad_limit() {
        let result = parse_args(&args(&["generate", "--limit", "lots"]));
        assert!(result.is_err());
    }

    #[test]
    fn sync_takes_optional_path() {
        let cmd = parse_args(&args(&["sync", "/tmp/my-issues.md"])).unwrap();
        assert_eq!(
            cmd,
            Command::Sync {
                path: Some(PathBuf::from("/tmp/my-issues.md"))
            }
        );
        assert_eq!(
            parse_args(&args(&["sync"])).unwrap(),
            Command::Sync { path: None }
        );
    }

    #[test]
    fn add_joins_title_words() {
        let cmd = parse_args(&args(&["add", "Fix", "the", "login", "bug"])).unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                title: "Fix the login bug".to_string(),
                description: None,
                team: None
            }
        );
    }

    #[test]
    fn add_with_description_and_team() {
        let cmd = parse_args(&args(&[
            "add",
            "Fix login",
            "-d",
            "SSO is broken",
            "--team",
            "team-1",
        ]))
        .unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                title: "Fix login".to_string(),
                description: Some("SSO is broken".to_string()),
                team: Some("team-1".to_string())
            }
        );
    }

    #[test]
    fn add_without_title_fails() {
        assert!(parse_args(&args(&["add"])).is_err());
        let result = parse_args(&args(&["add", "-d", "only a description"]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn add_missing_flag_value_fails() {
        let result = parse_args(&args(&["add", "My task", "-d"]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Missing value"));
    }

    #[test]
    fn set_key_requires_exactly_one_value() {
        assert_eq!(
            parse_args(&args(&["set-key", "lin_api_x"])).unwrap(),
            Command::SetKey {
                key: "lin_api_x".to_string()
            }
        );
        assert!(parse_args(&args(&["set-key"])).is_err());
        assert!(parse_args(&args(&["set-key", "a", "b"])).is_err());
    }

    #[test]
    fn add_preserves_unicode_title() {
        let cmd = parse_args(&args(&["add", "修复登录 bug 🐛"])).unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                title: "修复登录 bug 🐛".to_string(),
                description: None,
                team: None
            }
        );
    }

    #[tokio::test]
    async fn sync_without_api_key_reports_not_configured() {
        let config = AppConfig::default();
        let result = handle_sync(&config, Some(PathBuf::from("/nonexistent.md"))).await;
        // No intents parse from a missing file, but the reconciler still
        // refuses to run without a tracker.
        assert!(result.is_err());
    }
}
