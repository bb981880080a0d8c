//! External program actuator
//!
//! Spawns the configured program once per attempt. The rendered text is
//! written to its stdin and the media reference, when there is one, is passed
//! in `HOMILY_MEDIA_REFERENCE`. Exit status 0 means published.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::Actuator;
use crate::models::RenderedContent;
use crate::utils::error::ActuationError;
use crate::utils::truncate_text;

/// Environment variable carrying the media reference
pub const MEDIA_REFERENCE_ENV: &str = "HOMILY_MEDIA_REFERENCE";

/// Stderr characters kept in failure messages
const STDERR_TAIL: usize = 300;

/// Actuator backed by an external program
#[derive(Debug, Clone)]
pub struct CommandActuator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandActuator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Actuator for CommandActuator {
    fn name(&self) -> &str {
        &self.program
    }

    async fn publish(&self, content: &RenderedContent) -> Result<(), ActuationError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match &content.media_reference {
            Some(reference) => command.env(MEDIA_REFERENCE_ENV, reference),
            None => command.env_remove(MEDIA_REFERENCE_ENV),
        };

        let mut child = command
            .spawn()
            .map_err(|e| ActuationError::Launch(format!("{}: {e}", self.program)))?;

        // the stdin write shares the deadline with the exit wait
        let stdin = child.stdin.take();
        let program = &self.program;
        let text = content.text.as_bytes();
        let run = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(text).await {
                    warn!(program = %program, error = %e, "Actuator did not read the full text");
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| ActuationError::Timeout(self.timeout))?
            .map_err(|e| ActuationError::Failed(format!("waiting for actuator: {e}")))?;

        if output.status.success() {
            debug!(program = %self.program, "Actuator reported success");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());

        Err(ActuationError::Failed(format!(
            "exit status {code}: {}",
            truncate_text(stderr.trim(), STDERR_TAIL)
        )))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn content() -> RenderedContent {
        RenderedContent {
            text: "Dios es fiel".into(),
            media_reference: Some("https://youtu.be/abc".into()),
        }
    }

    fn sh(script: &str, timeout: Duration) -> CommandActuator {
        CommandActuator::new("sh", vec!["-c".into(), script.into()], timeout)
    }

    #[tokio::test]
    async fn test_success_receives_text_and_reference() {
        let actuator = sh(
            r#"read line; [ "$line" = "Dios es fiel" ] && [ "$HOMILY_MEDIA_REFERENCE" = "https://youtu.be/abc" ]"#,
            Duration::from_secs(5),
        );
        actuator.publish(&content()).await.unwrap();
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let actuator = sh("echo 'composer not found' >&2; exit 3", Duration::from_secs(5));
        let err = actuator.publish(&content()).await.unwrap_err();
        match err {
            ActuationError::Failed(msg) => {
                assert!(msg.contains("exit status 3"));
                assert!(msg.contains("composer not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let actuator = sh("sleep 5", Duration::from_millis(100));
        let err = actuator.publish(&content()).await.unwrap_err();
        assert!(matches!(err, ActuationError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_timeout_covers_unread_stdin() {
        // larger than any pipe buffer, never read by the program
        let large = RenderedContent {
            text: "x".repeat(1 << 20),
            media_reference: None,
        };
        let actuator = sh("sleep 5", Duration::from_millis(100));

        let started = std::time::Instant::now();
        let err = actuator.publish(&large).await.unwrap_err();

        assert!(matches!(err, ActuationError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let actuator = CommandActuator::new(
            "/nonexistent/homily-actuator",
            Vec::new(),
            Duration::from_secs(1),
        );
        let err = actuator.publish(&content()).await.unwrap_err();
        assert!(matches!(err, ActuationError::Launch(_)));
    }
}
