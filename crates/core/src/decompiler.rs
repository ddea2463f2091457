use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

pub type DecompileError = Box<dyn Error + Send + Sync>;

/// Turns a produced jar back into sources for inspection. Failures never fail the build.
pub trait Decompiler: Send + Sync {
    fn decompile(&self, jar: &Path, output_dir: &Path) -> Result<(), DecompileError>;
}

/// Runs a decompiler tool jar with `java -jar <tool> <jar> <output>`.
#[derive(Debug, Clone)]
pub struct ToolJarDecompiler {
    java: PathBuf,
    tool_jar: PathBuf,
}

impl ToolJarDecompiler {
    pub fn new(tool_jar: impl Into<PathBuf>) -> Self {
        let java = std::env::var_os("JAVA_HOME")
            .map(|home| PathBuf::from(home).join("bin/java"))
            .unwrap_or_else(|| PathBuf::from("java"));
        Self {
            java,
            tool_jar: tool_jar.into(),
        }
    }
}

impl Decompiler for ToolJarDecompiler {
    fn decompile(&self, jar: &Path, output_dir: &Path) -> Result<(), DecompileError> {
        if !self.tool_jar.is_file() {
            return Err(format!("decompiler not found at {}", self.tool_jar.display()).into());
        }
        debug!("Decompiling {} into {}", jar.display(), output_dir.display());
        let status = Command::new(&self.java)
            .arg("-jar")
            .arg(&self.tool_jar)
            .arg(jar)
            .arg(output_dir)
            .status()?;
        if !status.success() {
            return Err(format!("decompiler exited with {status}").into());
        }
        Ok(())
    }
}

/// Returns whether decompilation succeeded; failures are logged.
pub(crate) fn run(decompiler: &dyn Decompiler, jar: &Path, output_dir: &Path) -> bool {
    match decompiler.decompile(jar, output_dir) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to decompile {}: {}", jar.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let decompiler = ToolJarDecompiler::new(dir.path().join("missing.jar"));
        assert!(!run(&decompiler, &dir.path().join("a.jar"), dir.path()));
    }
}
