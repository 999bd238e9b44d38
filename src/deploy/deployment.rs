// ABOUTME: The deployment record and the requests that create or change it.
// ABOUTME: Requests validate raw input before anything is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::state::DeploymentStatus;
use crate::types::{
    BranchName, ContainerId, DeploymentId, OwnerId, RepoUrl, ValidationError, validate_env,
};

/// One user's request to run a repository, plus where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: DeploymentId,
    pub owner: OwnerId,
    pub repo_url: RepoUrl,
    pub branch: BranchName,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub start_command: String,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    pub status: DeploymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_ref: Option<ContainerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Last status or error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Build a fresh `initializing` record, stamped now.
    pub fn from_new(new: NewDeployment) -> Self {
        let now = Utc::now();
        Self {
            id: new.id,
            owner: new.owner,
            repo_url: new.repo_url,
            branch: new.branch,
            build_command: new.build_command,
            start_command: new.start_command,
            env_vars: new.env_vars,
            status: DeploymentStatus::Initializing,
            container_ref: None,
            image_ref: None,
            url: None,
            logs: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Forget every runtime resource handle.
    pub fn clear_runtime_refs(&mut self) {
        self.container_ref = None;
        self.image_ref = None;
        self.url = None;
    }
}

/// A validated deployment ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeployment {
    pub id: DeploymentId,
    pub owner: OwnerId,
    pub repo_url: RepoUrl,
    pub branch: BranchName,
    pub build_command: String,
    pub start_command: String,
    pub env_vars: BTreeMap<String, String>,
}

/// Raw creation input, as received from a caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub owner: OwnerId,
    pub repo_url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub build_command: String,
    #[serde(default)]
    pub start_command: String,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

impl DeployRequest {
    pub fn new(owner: OwnerId, repo_url: impl Into<String>) -> Self {
        Self {
            owner,
            repo_url: repo_url.into(),
            branch: None,
            build_command: String::new(),
            start_command: String::new(),
            env_vars: BTreeMap::new(),
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = command.into();
        self
    }

    pub fn start_command(mut self, command: impl Into<String>) -> Self {
        self.start_command = command.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Check every field and allocate an id. `default_branch` applies when
    /// no branch was given.
    pub fn validate(self, default_branch: &str) -> Result<NewDeployment, ValidationError> {
        let repo_url = RepoUrl::parse(&self.repo_url)?;
        let branch = match self.branch.as_deref().map(str::trim) {
            Some(b) if !b.is_empty() => BranchName::new(b)?,
            _ => BranchName::new(default_branch)?,
        };
        let build_command = validate_command("buildCommand", self.build_command)?;
        let start_command = validate_command("startCommand", self.start_command)?;
        validate_env(&self.env_vars)?;

        Ok(NewDeployment {
            id: DeploymentId::generate(),
            owner: self.owner,
            repo_url,
            branch,
            build_command,
            start_command,
            env_vars: self.env_vars,
        })
    }
}

/// Changes an explicit update request applies before redeploying.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployUpdate {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
    /// Replaces the whole environment when present.
    #[serde(default)]
    pub env_vars: Option<BTreeMap<String, String>>,
}

impl DeployUpdate {
    /// Validate and write the changes into `deployment`. Nothing is
    /// written if any field is invalid.
    pub fn apply_to(self, deployment: &mut Deployment) -> Result<(), ValidationError> {
        let branch = self.branch.as_deref().map(BranchName::new).transpose()?;
        let build_command = self
            .build_command
            .map(|c| validate_command("buildCommand", c))
            .transpose()?;
        let start_command = self
            .start_command
            .map(|c| validate_command("startCommand", c))
            .transpose()?;
        if let Some(env) = &self.env_vars {
            validate_env(env)?;
        }

        if let Some(branch) = branch {
            deployment.branch = branch;
        }
        if let Some(command) = build_command {
            deployment.build_command = command;
        }
        if let Some(command) = start_command {
            deployment.start_command = command;
        }
        if let Some(env) = self.env_vars {
            deployment.env_vars = env;
        }
        Ok(())
    }
}

fn validate_command(field: &'static str, command: String) -> Result<String, ValidationError> {
    let command = command.trim();
    if command.contains(['\n', '\r']) {
        return Err(ValidationError::MultilineCommand(field));
    }
    Ok(command.to_string())
}
