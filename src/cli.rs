use clap::{Parser, Subcommand};
use crate::models::{ImpactLevel, ProjectId, RiskIssueKind, RiskIssueStatus};

#[derive(Parser)]
#[command(name = "pms")]
#[command(about = "Terminal client for the project management API: activity, risks/issues and expenditures")]
#[command(version)]
pub struct Cli {
    /// Bearer token to use instead of the stored session
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive terminal UI for a project
    Tui {
        /// Project ID
        #[arg(short, long)]
        project: ProjectId,

        /// Act as the project owner (may change risk status and report risks)
        #[arg(long)]
        owner: bool,
    },

    /// Show recent activity
    Notifications {
        /// Keep polling and print new activity as it arrives
        #[arg(short, long)]
        watch: bool,
    },

    /// Project risks and issues
    Risks {
        #[command(subcommand)]
        command: RisksCommand,
    },

    /// Project expenditures
    Expenditure {
        #[command(subcommand)]
        command: ExpenditureCommand,
    },

    /// Store the `--token` given as the session for later commands
    Login {
        /// Display name shown in the navigation
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum RisksCommand {
    /// List risks and issues of a project
    List {
        #[arg(short, long)]
        project: ProjectId,
    },

    /// Report a new risk or issue
    Report {
        #[arg(short, long)]
        project: ProjectId,

        /// issue or risk
        #[arg(long = "type", default_value = "issue")]
        kind: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        impact: String,
    },

    /// Change the status of a risk or issue
    SetStatus {
        #[arg(short, long)]
        project: ProjectId,

        /// Risk/issue ID
        #[arg(long)]
        id: u64,

        /// open or closed
        #[arg(short, long)]
        status: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenditureCommand {
    /// Record an expenditure
    Add {
        #[arg(short, long)]
        project: ProjectId,

        /// Amount, e.g. 150.50
        #[arg(short, long)]
        amount: String,

        #[arg(short, long)]
        description: String,
    },

    /// List recorded expenditures
    List {
        #[arg(short, long)]
        project: ProjectId,
    },
}

impl Commands {
    pub fn parse_kind(kind: &str) -> Result<RiskIssueKind, anyhow::Error> {
        match kind.to_lowercase().as_str() {
            "issue" => Ok(RiskIssueKind::Issue),
            "risk" => Ok(RiskIssueKind::Risk),
            other => Err(anyhow::anyhow!("Unsupported type: {}. Supported types: issue, risk", other)),
        }
    }

    pub fn parse_impact(impact: &str) -> Result<ImpactLevel, anyhow::Error> {
        match impact.to_lowercase().as_str() {
            "low" => Ok(ImpactLevel::Low),
            "medium" | "med" => Ok(ImpactLevel::Medium),
            "high" => Ok(ImpactLevel::High),
            other => Err(anyhow::anyhow!("Unsupported impact level: {}. Supported levels: low, medium, high", other)),
        }
    }

    pub fn parse_status(status: &str) -> Result<RiskIssueStatus, anyhow::Error> {
        match status.to_lowercase().as_str() {
            "open" => Ok(RiskIssueStatus::Open),
            "closed" | "close" => Ok(RiskIssueStatus::Closed),
            other => Err(anyhow::anyhow!("Unsupported status: {}. Supported statuses: open, closed", other)),
        }
    }
}
