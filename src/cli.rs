// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Build and run git repositories as containers on Docker and Podman")]
#[command(version)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Owner the deployments belong to
    #[arg(long, global = true, env = "SKIFF_OWNER")]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a skiff.yml configuration template
    Init {
        /// Overwrite an existing skiff.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Clone, build, and start a repository
    Deploy {
        /// Repository to deploy (https, ssh, or git url)
        repo_url: String,

        #[command(flatten)]
        settings: DeploySettings,
    },

    /// Restart a deployment's container
    Restart {
        /// Deployment id
        id: String,
    },

    /// Stop a deployment and remove everything it created
    Delete {
        /// Deployment id
        id: String,
    },

    /// Apply changes and rebuild a deployment from a fresh clone
    Redeploy {
        /// Deployment id
        id: String,

        #[command(flatten)]
        settings: DeploySettings,
    },

    /// Show one deployment, or all of the owner's deployments
    Status {
        /// Deployment id
        id: Option<String>,
    },
}

#[derive(Args)]
pub struct DeploySettings {
    /// Branch to clone
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Command run while building the image
    #[arg(long = "build", visible_alias = "build-command")]
    pub build_command: Option<String>,

    /// Command the container runs
    #[arg(long = "start", visible_alias = "start-command")]
    pub start_command: Option<String>,

    /// Environment variable for build and container, as KEY=VALUE
    #[arg(short, long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}
