//! The formatting pass applied to each generated artifact.
//!
//! Generation produces unindented C; a [`Formatter`] turns it into the final
//! text. The default is `clang-format`, run as a child process. Tests and
//! embedders that do their own formatting inject [`NoopFormatter`] or a
//! closure instead.

use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

/// Errors reported by a [`Formatter`].
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to run formatter {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("formatter {program:?} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("formatter {program:?} produced non-UTF-8 output")]
    NotUtf8 { program: String },

    #[error("formatter failed: {0}")]
    Other(String),
}

/// Turns raw generated C into its final form.
pub trait Formatter {
    fn format(&self, raw: String) -> Result<String, FormatError>;
}

impl<F> Formatter for F
where
    F: Fn(String) -> Result<String, FormatError>,
{
    fn format(&self, raw: String) -> Result<String, FormatError> {
        self(raw)
    }
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, raw: String) -> Result<String, FormatError> {
        Ok(raw)
    }
}

/// Pipes the text through `clang-format`.
#[derive(Debug, Clone)]
pub struct ClangFormat {
    pub program: String,
    pub style: String,
}

impl Default for ClangFormat {
    fn default() -> Self {
        Self {
            program: "clang-format".to_string(),
            style: "Chromium".to_string(),
        }
    }
}

impl Formatter for ClangFormat {
    fn format(&self, raw: String) -> Result<String, FormatError> {
        let spawn_err = |source| FormatError::Spawn {
            program: self.program.clone(),
            source,
        };
        let mut child = Command::new(&self.program)
            .arg(format!("-style={}", self.style))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Write on a separate thread so a full stdout pipe cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FormatError::Other("formatter stdin unavailable".to_string()))?;
        let writer = std::thread::spawn(move || stdin.write_all(raw.as_bytes()));

        let output = child.wait_with_output().map_err(spawn_err)?;
        match writer.join() {
            Ok(result) => result.map_err(spawn_err)?,
            Err(_) => return Err(FormatError::Other("formatter input thread panicked".to_string())),
        }

        if !output.status.success() {
            return Err(FormatError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| FormatError::NotUtf8 {
            program: self.program.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_returns_input() {
        assert_eq!(NoopFormatter.format("int x;\n".into()).unwrap(), "int x;\n");
    }

    #[test]
    fn closures_are_formatters() {
        let upper = |raw: String| -> Result<String, FormatError> { Ok(raw.to_uppercase()) };
        assert_eq!(upper.format("abc".into()).unwrap(), "ABC");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let fmt = ClangFormat {
            program: "tern-no-such-formatter-binary".to_string(),
            style: "LLVM".to_string(),
        };
        let err = fmt.format("int x;".into()).unwrap_err();
        assert!(matches!(err, FormatError::Spawn { .. }), "got {err:?}");
    }
}
