/// Shell command node
///
/// A non-zero exit code produces the captured output but marks the node
/// failed. Timeouts and spawn errors are external errors.

use super::{bind_variable, Execute, NodeContext, NodeOutput};
use crate::error::NodeError;
use crate::runtime::services::{CommandRequest, Services};
use crate::workflow::types::CommandConfig;
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
impl Execute for CommandConfig {
    async fn execute(&self, ctx: &NodeContext<'_>, services: &Services) -> Result<NodeOutput, NodeError> {
        if self.command.trim().is_empty() {
            return Err(NodeError::Configuration("command node has no command".to_string()));
        }

        let command = ctx.render(&self.command)?;
        let cwd = match self.cwd.as_deref().map(str::trim) {
            Some(cwd) if !cwd.is_empty() => Some(ctx.render(cwd)?),
            _ => None,
        };
        let env = ctx.render_pairs(&self.env)?;

        tracing::debug!("🖥️ Running command: {}", command);

        let output = services
            .exec
            .execute(CommandRequest {
                command,
                cwd,
                env,
                timeout: Some(ctx.timeout),
            })
            .await
            .map_err(|e| NodeError::External(format!("command failed to run: {}", e)))?;

        let data = json!({
            "stdout": output.stdout,
            "stderr": output.stderr,
            "exitCode": output.exit_code,
        });

        if !output.success() {
            let reason = match output.exit_code {
                Some(code) => format!("command exited with code {}", code),
                None => "command was terminated by a signal".to_string(),
            };
            tracing::warn!("⚠️ {}", reason);
            return Ok(NodeOutput::failed(data, NodeError::External(reason)));
        }

        let writes = bind_variable(self.variable.as_ref(), &data, "stdout")?;
        Ok(NodeOutput::new(data).with_variables(writes))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{services, Fixture, MockExec, MockHttp};
    use super::*;
    use crate::runtime::services::CommandOutput;
    use crate::workflow::types::VariableBinding;
    use std::sync::Arc;

    fn config(command: &str) -> CommandConfig {
        CommandConfig {
            command: command.to_string(),
            cwd: None,
            timeout_ms: None,
            env: vec![],
            variable: Some(VariableBinding {
                name: "OUT".to_string(),
                new_name: None,
                path: None,
            }),
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_binds_variable() {
        let fixture = Fixture::from_source(serde_json::json!({}));
        let out = config("echo hello")
            .execute(&fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap();
        assert_eq!(out.data["stdout"], "hello\n");
        assert_eq!(out.data["exitCode"], 0);
        assert_eq!(out.variable_writes, vec![("OUT".to_string(), "hello".to_string())]);
    }

    #[tokio::test]
    async fn non_zero_exit_marks_failure() {
        let fixture = Fixture::from_source(serde_json::json!({}));
        let mut svc = services(Arc::new(MockHttp::default()));
        svc.exec = Arc::new(MockExec(CommandOutput {
            stdout: String::new(),
            stderr: "nope".to_string(),
            exit_code: Some(2),
        }));
        let out = config("false").execute(&fixture.ctx(), &svc).await.unwrap();
        assert_eq!(out.data["stderr"], "nope");
        assert!(matches!(out.failure, Some(NodeError::External(_))));
        assert!(out.variable_writes.is_empty());
    }

    #[tokio::test]
    async fn empty_command_is_configuration_error() {
        let fixture = Fixture::from_source(serde_json::json!({}));
        let err = config("  ")
            .execute(&fixture.ctx(), &services(Arc::new(MockHttp::default())))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
