//! Scripted engines for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::runner::{Invocation, ToolError, ToolOutput, ToolRunner};

/// What a scripted engine does for one subject (the first argument of the invocation).
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Writes the given text to the artifact and exits 0.
    Artifact(String),
    /// Writes raw bytes to the artifact and exits 0.
    Bytes(Vec<u8>),
    /// Exits with the given code after printing to stderr.
    Exit(i32),
    /// Exits 0 without writing an artifact.
    NoArtifact,
}

/// Unscripted subjects get an empty artifact.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    scripts: HashMap<String, Script>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(mut self, subject: &str, script: Script) -> Self {
        self.scripts.insert(subject.to_string(), script);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let subject: String = invocation
            .args
            .first()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        let program: String = invocation.program.display().to_string();

        let content: &[u8] = match self.scripts.get(&subject) {
            Some(Script::Artifact(content)) => content.as_bytes(),
            Some(Script::Bytes(content)) => content,
            Some(Script::Exit(code)) => {
                return Err(ToolError::Exit {
                    program,
                    status: format!("exit status: {code}"),
                    stdout: String::new(),
                    stderr: format!("scripted failure for {subject}"),
                });
            }
            Some(Script::NoArtifact) => return Ok(ToolOutput::default()),
            None => b"",
        };

        if let Some(path) = &invocation.artifact {
            tokio::fs::write(path, content)
                .await
                .map_err(|source| ToolError::Spawn { program, source })?;
        }

        Ok(ToolOutput::default())
    }
}
