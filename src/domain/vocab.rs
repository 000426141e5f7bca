//! Token vocabulary loading and lookups.
//!
//! The vocabulary file holds one token per line; the line index is the token id.
//! Four sentinel tokens must be present: [`START_TOKEN`], [`END_TOKEN`],
//! [`PAD_TOKEN`] and [`UNK_TOKEN`].

use super::TokenId;
use crate::core::errors::{EvalError, EvalResult};
use std::collections::HashMap;
use std::path::Path;

/// Start-of-sequence sentinel.
pub const START_TOKEN: &str = "<s>";
/// End-of-sequence sentinel.
pub const END_TOKEN: &str = "</s>";
/// Padding sentinel.
pub const PAD_TOKEN: &str = "<pad>";
/// Out-of-vocabulary sentinel.
pub const UNK_TOKEN: &str = "<unk>";

/// Default vocabulary file name inside the data directory.
pub const VOCAB_FILE: &str = "vocab.txt";

/// Bidirectional token/id mapping.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    id_to_token: Vec<String>,
    token_to_id: HashMap<String, TokenId>,
    start_id: TokenId,
    end_id: TokenId,
    pad_id: TokenId,
    unk_id: TokenId,
}

impl Vocabulary {
    /// Builds a vocabulary from tokens listed in id order.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` if a token appears twice or a sentinel is missing.
    pub fn from_tokens<I, S>(tokens: I) -> EvalResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id_to_token: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut token_to_id = HashMap::with_capacity(id_to_token.len());
        for (id, token) in id_to_token.iter().enumerate() {
            let id = TokenId::try_from(id).map_err(|_| {
                EvalError::config_error(format!("vocabulary exceeds {} tokens", TokenId::MAX))
            })?;
            if token_to_id.insert(token.clone(), id).is_some() {
                return Err(EvalError::config_error(format!(
                    "duplicate vocabulary token '{}' at id {}",
                    token, id
                )));
            }
        }

        let sentinel = |name: &str| {
            token_to_id.get(name).copied().ok_or_else(|| {
                EvalError::config_error(format!("vocabulary is missing sentinel '{}'", name))
            })
        };
        let start_id = sentinel(START_TOKEN)?;
        let end_id = sentinel(END_TOKEN)?;
        let pad_id = sentinel(PAD_TOKEN)?;
        let unk_id = sentinel(UNK_TOKEN)?;

        Ok(Self {
            id_to_token,
            token_to_id,
            start_id,
            end_id,
            pad_id,
            unk_id,
        })
    }

    /// Loads a line-per-token vocabulary file.
    ///
    /// Trailing whitespace on each line is ignored; a trailing empty line is dropped.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> EvalResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EvalError::config_error(format!(
                "failed to read vocabulary from '{}': {}",
                path.display(),
                e
            ))
        })?;
        let vocab = Self::from_tokens(content.lines().map(str::trim_end))?;
        tracing::debug!("Loaded {} tokens from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    /// Whether the vocabulary is empty (never true for a loaded vocabulary).
    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    pub fn start_id(&self) -> TokenId {
        self.start_id
    }

    pub fn end_id(&self) -> TokenId {
        self.end_id
    }

    pub fn pad_id(&self) -> TokenId {
        self.pad_id
    }

    pub fn unk_id(&self) -> TokenId {
        self.unk_id
    }

    /// Id of `token`, or the UNKNOWN id.
    pub fn token_to_id(&self, token: &str) -> TokenId {
        self.token_to_id.get(token).copied().unwrap_or(self.unk_id)
    }

    /// Token for `id`, if in range.
    pub fn id_to_token(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    /// Detokenizes ids into a space-joined formula.
    ///
    /// START and PAD are skipped, decoding stops at the first END, and ids outside
    /// the vocabulary render as [`UNK_TOKEN`].
    pub fn ids_to_formula(&self, ids: &[TokenId]) -> String {
        let mut parts = Vec::with_capacity(ids.len());
        for &id in ids {
            if id == self.end_id {
                break;
            }
            if id == self.start_id || id == self.pad_id {
                continue;
            }
            parts.push(self.id_to_token(id).unwrap_or(UNK_TOKEN));
        }
        parts.join(" ")
    }

    /// Tokenizes a whitespace-separated formula into ids.
    pub fn formula_to_ids(&self, formula: &str) -> Vec<TokenId> {
        formula
            .split_whitespace()
            .map(|token| self.token_to_id(token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample() -> Vocabulary {
        Vocabulary::from_tokens(["<s>", "</s>", "<pad>", "<unk>", "x", "y", "\\frac"]).unwrap()
    }

    #[test]
    fn test_sentinel_ids() {
        let vocab = sample();
        assert_eq!(vocab.start_id(), 0);
        assert_eq!(vocab.end_id(), 1);
        assert_eq!(vocab.pad_id(), 2);
        assert_eq!(vocab.unk_id(), 3);
        assert_eq!(vocab.len(), 7);
    }

    #[test]
    fn test_ids_to_formula_skips_sentinels_and_stops_at_end() {
        let vocab = sample();
        assert_eq!(vocab.ids_to_formula(&[0, 6, 4, 2, 5, 1, 4]), "\\frac x y");
        assert_eq!(vocab.ids_to_formula(&[99]), "<unk>");
        assert_eq!(vocab.ids_to_formula(&[]), "");
    }

    #[test]
    fn test_formula_to_ids_maps_unknown() {
        let vocab = sample();
        assert_eq!(vocab.formula_to_ids("x  \\alpha y"), vec![4, 3, 5]);
    }

    #[test]
    fn test_missing_sentinel_is_config_error() {
        let err = Vocabulary::from_tokens(["<s>", "</s>", "<unk>"]).unwrap_err();
        assert!(matches!(err, EvalError::ConfigError { .. }));
        assert!(err.to_string().contains("<pad>"));
    }

    #[test]
    fn test_duplicate_token_is_config_error() {
        let err = Vocabulary::from_tokens(["<s>", "</s>", "<pad>", "<unk>", "x", "x"]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<pad>").unwrap();
        writeln!(file, "<s>").unwrap();
        writeln!(file, "</s>").unwrap();
        writeln!(file, "<unk>").unwrap();
        writeln!(file, "a").unwrap();

        let vocab = Vocabulary::load(file.path()).unwrap();
        assert_eq!(vocab.len(), 5);
        assert_eq!(vocab.pad_id(), 0);
        assert_eq!(vocab.token_to_id("a"), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Vocabulary::load(Path::new("/nonexistent/vocab.txt"));
        assert!(matches!(result, Err(EvalError::ConfigError { .. })));
    }
}
