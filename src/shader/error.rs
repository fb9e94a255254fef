use std::fmt;
use std::path::PathBuf;

use super::ShaderStage;

/// Why a program could not be built
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// One entry per stage that failed; both stages are always attempted
    #[error("{}", join_diagnostics(.0))]
    Compile(Vec<StageDiagnostic>),
    #[error("program link failed: {0}")]
    Link(String),
}

impl ShaderError {
    /// Stages that failed to compile (empty for I/O and link errors)
    pub fn failed_stages(&self) -> Vec<ShaderStage> {
        match self {
            ShaderError::Compile(diagnostics) => diagnostics.iter().map(|d| d.stage).collect(),
            _ => Vec::new(),
        }
    }
}

/// Compiler output for one failed stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDiagnostic {
    pub stage: ShaderStage,
    pub message: String,
}

impl StageDiagnostic {
    pub fn new(stage: ShaderStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for StageDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed to compile:\n{}", self.stage, self.message.trim_end())
    }
}

fn join_diagnostics(diagnostics: &[StageDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
