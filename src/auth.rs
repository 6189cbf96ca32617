use tracing::{debug, info};

use crate::config::GitHubConfig;

/// Try to run a CLI command and capture stdout as a token
fn try_cli_token(command: &str) -> Option<String> {
    let output = std::process::Command::new("sh")
        .args(["-c", command])
        .output()
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

fn env_token(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Find a token, trying in order:
/// 1. The env var named in config (`GITHUB_TOKEN` by default)
/// 2. The token command from config (`gh auth token` by default)
///
/// Returns `None` when neither yields one; the client then runs anonymously.
pub fn load_token(config: &GitHubConfig) -> Option<String> {
    if let Some(var) = &config.token_env {
        if let Some(token) = env_token(var) {
            debug!(var = %var, "using token from environment");
            return Some(token);
        }
    }

    if let Some(cmd) = &config.token_command {
        if let Some(token) = try_cli_token(cmd) {
            debug!(command = %cmd, "using token from command");
            return Some(token);
        }
    }

    info!("no GitHub token found, using anonymous access");
    None
}
