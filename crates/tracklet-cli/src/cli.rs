use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tracklet",
    about = "Tracklet: project-scoped issue records over a durable JSONL store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the issue API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: String,

        /// Path to the project collection JSONL
        #[arg(long, default_value = ".tracklet/projects.jsonl")]
        store: String,
    },

    /// Manage issues in the JSONL store directly
    Issue {
        #[command(subcommand)]
        command: IssueCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum IssueCommands {
    /// Add a new issue to a project
    Add {
        /// Issue title
        title: String,

        /// Issue text
        #[arg(long)]
        text: String,

        /// Author of the issue
        #[arg(long)]
        created_by: String,

        /// Optional assignee
        #[arg(long, default_value = "")]
        assigned_to: String,

        /// Optional status note
        #[arg(long, default_value = "")]
        status_text: String,

        /// Project the issue belongs to
        #[arg(long, default_value = "apitest")]
        project: String,

        /// Path to the project collection JSONL
        #[arg(long, default_value = ".tracklet/projects.jsonl")]
        store: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List issues in a project with optional filters
    List {
        /// Project to list
        #[arg(long, default_value = "apitest")]
        project: String,

        /// Exact-match filter as field=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Path to the project collection JSONL
        #[arg(long, default_value = ".tracklet/projects.jsonl")]
        store: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update an existing issue
    Update {
        /// Issue _id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// New author
        #[arg(long)]
        created_by: Option<String>,

        /// New assignee
        #[arg(long)]
        assigned_to: Option<String>,

        /// New status note
        #[arg(long)]
        status_text: Option<String>,

        /// Close the issue
        #[arg(long)]
        close: bool,

        /// Project the issue belongs to
        #[arg(long, default_value = "apitest")]
        project: String,

        /// Path to the project collection JSONL
        #[arg(long, default_value = ".tracklet/projects.jsonl")]
        store: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an issue
    Delete {
        /// Issue _id
        id: String,

        /// Project the issue belongs to
        #[arg(long, default_value = "apitest")]
        project: String,

        /// Path to the project collection JSONL
        #[arg(long, default_value = ".tracklet/projects.jsonl")]
        store: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
