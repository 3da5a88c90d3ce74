use crate::runtime::services::{CommandOutput, CommandRequest, CommandService};
use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

/// Runs commands through the platform shell
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandService;

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[async_trait]
impl CommandService for ShellCommandService {
    async fn execute(&self, request: CommandRequest) -> Result<CommandOutput> {
        tracing::debug!("🖥️ Running command: {}", request.command);

        let mut cmd = shell(&request.command);
        cmd.kill_on_drop(true);
        if let Some(cwd) = request.cwd.as_deref().filter(|c| !c.trim().is_empty()) {
            cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let output = match request.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| anyhow::anyhow!("command timed out after {} ms", timeout.as_millis()))??,
            None => cmd.output().await?,
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(command: &str) -> CommandRequest {
        CommandRequest {
            command: command.to_string(),
            cwd: None,
            env: vec![("GREETING".to_string(), "hi".to_string())],
            timeout: Some(Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let output = ShellCommandService
            .execute(request("echo $GREETING; echo oops >&2; exit 3"))
            .await
            .unwrap();
        assert_eq!(output.stdout, "hi\n");
        assert_eq!(output.stderr, "oops\n");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[tokio::test]
    async fn slow_commands_time_out() {
        let mut slow = request("sleep 5");
        slow.timeout = Some(Duration::from_millis(50));
        let err = ShellCommandService.execute(slow).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
