use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use trawl_fuzzy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ProjectArgs {
    #[arg(long, help = "Project name")]
    pub project: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ImportGitArgs {
    #[arg(long, help = "Project name, created when missing")]
    pub project: String,

    #[arg(long, help = "Repository to read (defaults to the workspace)")]
    pub repo: Option<PathBuf>,

    #[arg(long, help = "Import at most this many commits, newest first")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ImportBugsArgs {
    #[arg(long, help = "Project name, created when missing")]
    pub project: String,

    #[arg(help = "JSON bug document")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct FragmentsArgs {
    #[arg(long, help = "Project name")]
    pub project: String,

    #[arg(long, help = "Bug number")]
    pub bug: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct EncodeArgs {
    #[arg(
        long,
        default_value = "direct",
        value_parser = parse_strategy,
        help = "Encoding strategy"
    )]
    pub strategy: Strategy,

    #[arg(required = true, help = "Words to encode")]
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Import commits and their authors from a git repository
    ImportGit(ImportGitArgs),
    /// Import bugs, attachments and comments from a JSON document
    ImportBugs(ImportBugsArgs),
    /// Resolve identities into users
    Interlink(ProjectArgs),
    /// Segment comments and attribute their fragments
    Attribute(ProjectArgs),
    /// Link commits to the bugs their messages reference
    LinkCommits(ProjectArgs),
    /// Run interlink, attribute and link-commits in order
    Mine(ProjectArgs),
    /// Print resolved users with their identities
    Users(ProjectArgs),
    /// Print commit to bug links
    Links(ProjectArgs),
    /// Print the attributed fragments of one bug's comments
    Fragments(FragmentsArgs),
    /// List the available encoding strategies
    Strategies,
    /// Show the codes a strategy produces for words
    Encode(EncodeArgs),
}

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Mine identities, comment attribution and commit links from project history"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding the .trawl directory"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_strategy(value: &str) -> Result<Strategy, String> {
    value.parse()
}
