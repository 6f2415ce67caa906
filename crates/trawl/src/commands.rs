use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use trawl_analysis::{
    AttributionAnalyzer, CommitLinkAnalyzer, EngineSettings, GitImportRequest, Importer,
    InterlinkAnalyzer,
};
use trawl_config::load_workspace_config;
use trawl_fuzzy::Strategy;
use trawl_store::{ProjectRecord, SqliteStore, Store};

use crate::cli::{
    Commands, EncodeArgs, FragmentsArgs, ImportBugsArgs, ImportGitArgs, ProjectArgs,
};

pub fn run_command(workspace: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::ImportGit(args) => run_import_git_command(workspace, args),
        Commands::ImportBugs(args) => run_import_bugs_command(workspace, args),
        Commands::Interlink(args) => run_interlink_command(workspace, args),
        Commands::Attribute(args) => run_attribute_command(workspace, args),
        Commands::LinkCommits(args) => run_link_commits_command(workspace, args),
        Commands::Mine(args) => run_mine_command(workspace, args),
        Commands::Users(args) => run_users_command(workspace, args),
        Commands::Links(args) => run_links_command(workspace, args),
        Commands::Fragments(args) => run_fragments_command(workspace, args),
        Commands::Strategies => run_strategies_command(),
        Commands::Encode(args) => run_encode_command(args),
    }
}

pub fn run_import_git_command(workspace: &Path, args: ImportGitArgs) -> Result<()> {
    let outcome = Importer::new(workspace)
        .import_git(GitImportRequest {
            project: args.project,
            repository: args.repo,
            limit: args.limit,
        })
        .context("git import failed")?;
    let value = serde_json::to_value(outcome).context("failed to serialize git import output")?;
    write_json_to_stdout(&value)
}

pub fn run_import_bugs_command(workspace: &Path, args: ImportBugsArgs) -> Result<()> {
    let outcome = Importer::new(workspace)
        .import_bugs(&args.project, &args.file)
        .with_context(|| format!("bug import from {} failed", args.file.display()))?;
    let value = serde_json::to_value(outcome).context("failed to serialize bug import output")?;
    write_json_to_stdout(&value)
}

pub fn run_interlink_command(workspace: &Path, args: ProjectArgs) -> Result<()> {
    let analyzer =
        InterlinkAnalyzer::new(workspace).context("failed to initialize interlink analyzer")?;
    let outcome = analyzer.run(&args.project).context("interlink failed")?;
    let value = serde_json::to_value(outcome).context("failed to serialize interlink output")?;
    write_json_to_stdout(&value)
}

pub fn run_attribute_command(workspace: &Path, args: ProjectArgs) -> Result<()> {
    let analyzer =
        AttributionAnalyzer::new(workspace).context("failed to initialize attribution analyzer")?;
    let outcome = analyzer.run(&args.project).context("attribution failed")?;
    let value = serde_json::to_value(outcome).context("failed to serialize attribution output")?;
    write_json_to_stdout(&value)
}

pub fn run_link_commits_command(workspace: &Path, args: ProjectArgs) -> Result<()> {
    let analyzer =
        CommitLinkAnalyzer::new(workspace).context("failed to initialize commit link analyzer")?;
    let outcome = analyzer.run(&args.project).context("commit linking failed")?;
    let value = serde_json::to_value(outcome).context("failed to serialize commit link output")?;
    write_json_to_stdout(&value)
}

/// Resolves the settings once, so a bad config fails before any pass writes.
pub fn run_mine_command(workspace: &Path, args: ProjectArgs) -> Result<()> {
    let config = load_workspace_config(workspace).context("failed to load workspace config")?;
    let settings = EngineSettings::from_config(&config).context("invalid workspace config")?;

    let interlink = InterlinkAnalyzer::with_settings(workspace, settings.clone())
        .run(&args.project)
        .context("interlink failed")?;
    let attribution = AttributionAnalyzer::with_settings(workspace, &settings)
        .run(&args.project)
        .context("attribution failed")?;
    let commit_links = CommitLinkAnalyzer::with_settings(workspace, &settings)
        .run(&args.project)
        .context("commit linking failed")?;

    write_json_to_stdout(&json!({
        "interlink": interlink,
        "attribution": attribution,
        "commit_links": commit_links,
    }))
}

pub fn run_users_command(workspace: &Path, args: ProjectArgs) -> Result<()> {
    let store = open_store(workspace)?;
    let project = require_project(&store, &args.project)?;
    let identities = store
        .list_identities(project.id)
        .context("failed to list identities")?
        .into_iter()
        .map(|identity| (identity.id, identity))
        .collect::<HashMap<_, _>>();
    let users = store
        .list_users(project.id)
        .context("failed to list users")?;

    let users = users
        .into_iter()
        .map(|user| {
            let members = user
                .identity_ids
                .iter()
                .filter_map(|id| identities.get(id))
                .collect::<Vec<_>>();
            json!({
                "id": user.id,
                "name": user.name,
                "identities": members,
            })
        })
        .collect::<Vec<_>>();

    write_json_to_stdout(&json!({
        "project": project.name,
        "users": users,
    }))
}

pub fn run_links_command(workspace: &Path, args: ProjectArgs) -> Result<()> {
    let store = open_store(workspace)?;
    let project = require_project(&store, &args.project)?;
    let commits = store
        .list_commits(project.id)
        .context("failed to list commits")?
        .into_iter()
        .map(|commit| (commit.id, commit.hash))
        .collect::<HashMap<_, _>>();
    let bugs = store
        .list_bugs(project.id)
        .context("failed to list bugs")?
        .into_iter()
        .map(|bug| (bug.id, bug.number))
        .collect::<HashMap<_, _>>();
    let links = store
        .list_commit_links(project.id)
        .context("failed to list commit links")?;

    let links = links
        .into_iter()
        .map(|link| {
            json!({
                "commit": commits.get(&link.commit_id),
                "bug": bugs.get(&link.bug_id),
                "certainty": link.certainty,
            })
        })
        .collect::<Vec<_>>();

    write_json_to_stdout(&json!({
        "project": project.name,
        "links": links,
    }))
}

pub fn run_fragments_command(workspace: &Path, args: FragmentsArgs) -> Result<()> {
    let store = open_store(workspace)?;
    let project = require_project(&store, &args.project)?;
    let bug = store
        .find_bug(project.id, args.bug)
        .context("failed to look up bug")?
        .with_context(|| format!("unknown bug {} in project '{}'", args.bug, project.name))?;

    let mut comments = Vec::new();
    for comment in store
        .list_comments(bug.id)
        .context("failed to list comments")?
    {
        let fragments = store
            .list_comment_fragments(comment.id)
            .with_context(|| format!("failed to list fragments of comment {}", comment.id))?;
        comments.push(json!({
            "ordinal": comment.ordinal,
            "author_id": comment.author_id,
            "fragments": fragments,
        }));
    }

    write_json_to_stdout(&json!({
        "project": project.name,
        "bug": bug.number,
        "title": bug.title,
        "comments": comments,
    }))
}

pub fn run_strategies_command() -> Result<()> {
    let names = Strategy::ALL
        .iter()
        .map(|strategy| strategy.as_str())
        .collect::<Vec<_>>();
    write_json_to_stdout(&json!({ "strategies": names }))
}

pub fn run_encode_command(args: EncodeArgs) -> Result<()> {
    let encoded = args
        .words
        .iter()
        .map(|word| json!({ "word": word, "codes": args.strategy.encode(word) }))
        .collect::<Vec<_>>();
    write_json_to_stdout(&json!({
        "strategy": args.strategy.as_str(),
        "words": encoded,
    }))
}

fn open_store(workspace: &Path) -> Result<SqliteStore> {
    SqliteStore::open(workspace)
        .with_context(|| format!("failed to open store under {}", workspace.display()))
}

fn require_project(store: &SqliteStore, name: &str) -> Result<ProjectRecord> {
    store
        .find_project(name)
        .context("failed to look up project")?
        .with_context(|| format!("unknown project '{}'", name.trim()))
}

fn write_json_to_stdout(value: &serde_json::Value) -> Result<()> {
    let mut out = std::io::stdout();
    serde_json::to_writer_pretty(&mut out, value).context("failed to serialize JSON output")?;
    writeln!(&mut out).context("failed to write trailing newline")?;
    Ok(())
}
