//! Reading and writing newline-delimited corpus files.

use crate::core::errors::{EvalError, EvalResult};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one line per entry, creating parent directories as needed.
///
/// Embedded newlines would break line alignment, so they are replaced by spaces.
pub fn write_corpus<S: AsRef<str>>(path: &Path, lines: &[S]) -> EvalResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        let line = line.as_ref();
        if line.contains(['\n', '\r']) {
            writeln!(writer, "{}", line.replace(['\n', '\r'], " "))?;
        } else {
            writeln!(writer, "{}", line)?;
        }
    }
    writer.flush()?;
    tracing::debug!("Wrote {} lines to {}", lines.len(), path.display());
    Ok(())
}

/// Reads a corpus file, one entry per line.
///
/// # Errors
///
/// Returns `EvalError::InvalidInput` naming the file if it cannot be read.
pub fn read_corpus(path: &Path) -> EvalResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        EvalError::invalid_input(format!("failed to read corpus '{}': {}", path.display(), e))
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Writes an aligned hypothesis/reference pair of corpora.
///
/// # Errors
///
/// Returns `EvalError::LengthMismatch` without touching either file when the corpora
/// are not aligned.
pub fn write_corpus_pair<S: AsRef<str>>(
    hypothesis_path: &Path,
    reference_path: &Path,
    hypotheses: &[S],
    references: &[S],
) -> EvalResult<()> {
    if hypotheses.len() != references.len() {
        return Err(EvalError::LengthMismatch {
            hypotheses: hypotheses.len(),
            references: references.len(),
        });
    }
    write_corpus(hypothesis_path, hypotheses)?;
    write_corpus(reference_path, references)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_with_empty_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("result.txt");
        write_corpus(&path, &["x ^ 2", "", "a + b"]).unwrap();
        assert_eq!(read_corpus(&path).unwrap(), vec!["x ^ 2", "", "a + b"]);
    }

    #[test]
    fn test_newlines_are_flattened() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.txt");
        write_corpus(&path, &["a\nb"]).unwrap();
        assert_eq!(read_corpus(&path).unwrap(), vec!["a b"]);
    }

    #[test]
    fn test_pair_rejects_mismatch() {
        let dir = tempdir().unwrap();
        let hyp = dir.path().join("result.txt");
        let reference = dir.path().join("ref.txt");
        let err = write_corpus_pair(&hyp, &reference, &["a"], &[]).unwrap_err();
        assert!(matches!(err, EvalError::LengthMismatch { .. }));
        assert!(!hyp.exists());
    }

    #[test]
    fn test_read_missing_corpus() {
        let result = read_corpus(Path::new("/nonexistent/ref.txt"));
        assert!(matches!(result, Err(EvalError::InvalidInput { .. })));
    }
}
