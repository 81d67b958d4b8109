//! Run identity from the enclosing git repository

use chrono::Utc;
use std::path::Path;
use tokio::process::Command;

use super::MergeError;
use crate::models::RunIdentity;

async fn git(repo_dir: &Path, args: &[&str]) -> Result<String, MergeError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .await
        .map_err(|e| MergeError::Identity {
            reason: format!("failed to run git in {}: {e}", repo_dir.display()),
        })?;

    if !output.status.success() {
        return Err(MergeError::Identity {
            reason: format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err(MergeError::Identity {
            reason: format!("git {} returned nothing", args.join(" ")),
        });
    }
    Ok(value)
}

/// Current branch name of `repo_dir`
pub async fn current_branch(repo_dir: &Path) -> Result<String, MergeError> {
    git(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await
}

/// Branch, short commit and the current time
pub async fn current_identity(repo_dir: &Path) -> Result<RunIdentity, MergeError> {
    let branch = current_branch(repo_dir).await?;
    let commit = git(repo_dir, &["rev-parse", "--short", "HEAD"]).await?;
    let identity = RunIdentity::new(branch, commit, Utc::now());
    tracing::debug!(identity = %identity, "Resolved run identity");
    Ok(identity)
}
