//! The `{tool}w` launcher script placed at the project root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate `env` locations, checked in order for the shebang line.
const DEFAULT_INTERPRETERS: [&str; 2] = ["/bin/env", "/usr/bin/env"];

/// A shell script that runs the project's launcher jar with all arguments.
#[derive(Debug, Clone)]
pub struct LauncherScript {
    interpreter_candidates: Vec<PathBuf>,
    jar_relative: String,
}

impl LauncherScript {
    /// `jar_relative` is the launcher jar path relative to the script.
    pub fn new(jar_relative: impl Into<String>) -> Self {
        Self {
            interpreter_candidates: DEFAULT_INTERPRETERS.iter().map(PathBuf::from).collect(),
            jar_relative: jar_relative.into(),
        }
    }

    /// Replaces the `env` locations probed for the shebang.
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.interpreter_candidates = candidates;
        self
    }

    /// `#!<env> bash` for the first existing candidate, if any.
    pub fn shebang(&self) -> Option<String> {
        self.interpreter_candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .map(|env| format!("#!{} bash", env.display()))
    }

    /// Full script text.
    pub fn render(&self) -> String {
        let mut script = String::new();
        if let Some(shebang) = self.shebang() {
            script.push_str(&shebang);
            script.push('\n');
        }
        script.push_str(&format!(
            "java -jar $(dirname $0)/{} \"$@\"\n",
            self.jar_relative
        ));
        script
    }

    /// Writes the script to `path`. Marking it executable is up to the caller.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.render())?;
        debug!("Wrote launcher script {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_with_first_existing_interpreter() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("bin/env");
        let present = temp_dir.path().join("usr-bin-env");
        fs::write(&present, b"").unwrap();

        let script = LauncherScript::new("kobalt/wrapper/kobalt-wrapper.jar")
            .with_candidates(vec![missing, present.clone()]);

        assert_eq!(
            script.render(),
            format!(
                "#!{} bash\njava -jar $(dirname $0)/kobalt/wrapper/kobalt-wrapper.jar \"$@\"\n",
                present.display()
            )
        );
    }

    #[test]
    fn test_render_without_interpreter() {
        let script = LauncherScript::new("kobalt/wrapper/kobalt-wrapper.jar")
            .with_candidates(Vec::new());

        assert!(script.shebang().is_none());
        assert_eq!(
            script.render(),
            "java -jar $(dirname $0)/kobalt/wrapper/kobalt-wrapper.jar \"$@\"\n"
        );
    }

    #[test]
    fn test_write_script() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kobaltw");

        let script = LauncherScript::new("kobalt/wrapper/kobalt-wrapper.jar")
            .with_candidates(Vec::new());
        script.write(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), script.render());
    }
}
