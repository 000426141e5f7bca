//! im2latex-style dataset listing.
//!
//! The data directory contains a formula file (`im2latex_formulas.norm.lst`, one
//! whitespace-tokenized formula per line) and one index file per split
//! (`im2latex_{split}_filter.lst`, lines of `<image_file> <formula_index>`).
//! Image files are resolved against a separate image directory.

use super::{TokenId, Vocabulary};
use crate::core::errors::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Formula file name inside the data directory.
pub const FORMULAS_FILE: &str = "im2latex_formulas.norm.lst";

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    #[default]
    Validate,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validate => "validate",
            Split::Test => "test",
        }
    }

    /// Index file name of this split.
    pub fn index_file(&self) -> String {
        format!("im2latex_{}_filter.lst", self.as_str())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "validate" | "val" | "validation" => Ok(Split::Validate),
            "test" => Ok(Split::Test),
            other => Err(EvalError::config_error_with_context(
                "split",
                other,
                "expected one of train, validate, test",
            )),
        }
    }
}

/// One evaluation example.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetItem {
    /// Position in the dataset (after filtering); corpora keep this order.
    pub index: usize,
    pub image_path: PathBuf,
    /// Reference token ids, without sentinels.
    pub reference: Vec<TokenId>,
}

/// Loaded split of an im2latex dataset.
#[derive(Debug, Clone)]
pub struct FormulaDataset {
    split: Split,
    items: Vec<DatasetItem>,
    filtered: usize,
}

impl FormulaDataset {
    /// Loads `split` from `data_dir`, resolving images under `image_dir`.
    ///
    /// Formulas with more than `max_len` tokens are dropped.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ConfigError` when a file is missing or unreadable, an index
    /// line is malformed, or a formula index is out of range.
    pub fn load(
        data_dir: &Path,
        image_dir: &Path,
        split: Split,
        vocab: &Vocabulary,
        max_len: usize,
    ) -> EvalResult<Self> {
        let formulas_path = data_dir.join(FORMULAS_FILE);
        let formulas = read_listing(&formulas_path)?;
        let index_path = data_dir.join(split.index_file());
        let index = read_listing(&index_path)?;

        let formulas: Vec<&str> = formulas.lines().collect();
        let mut items = Vec::new();
        let mut filtered = 0usize;

        for (line_no, line) in index.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (image_name, formula_idx) = parse_index_line(line).ok_or_else(|| {
                EvalError::config_error(format!(
                    "{}:{}: expected '<image> <formula_index>', got '{}'",
                    index_path.display(),
                    line_no + 1,
                    line
                ))
            })?;
            let formula = formulas.get(formula_idx).ok_or_else(|| {
                EvalError::config_error(format!(
                    "{}:{}: formula index {} out of range ({} formulas)",
                    index_path.display(),
                    line_no + 1,
                    formula_idx,
                    formulas.len()
                ))
            })?;

            let reference = vocab.formula_to_ids(formula);
            if reference.len() > max_len {
                filtered += 1;
                continue;
            }
            items.push(DatasetItem {
                index: items.len(),
                image_path: image_dir.join(image_name),
                reference,
            });
        }

        if filtered > 0 {
            tracing::info!(
                "Filtered {} {} formulas longer than {} tokens",
                filtered,
                split,
                max_len
            );
        }
        tracing::info!("Loaded {} {} items", items.len(), split);

        Ok(Self {
            split,
            items,
            filtered,
        })
    }

    /// Builds a dataset from already prepared items (re-indexed in order).
    pub fn from_items(split: Split, items: Vec<DatasetItem>) -> Self {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| DatasetItem { index, ..item })
            .collect();
        Self {
            split,
            items,
            filtered: 0,
        }
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn items(&self) -> &[DatasetItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<DatasetItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Rows dropped because their formula exceeded the length limit.
    pub fn filtered(&self) -> usize {
        self.filtered
    }
}

fn read_listing(path: &Path) -> EvalResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        EvalError::config_error(format!("failed to read '{}': {}", path.display(), e))
    })
}

fn parse_index_line(line: &str) -> Option<(&str, usize)> {
    let mut parts = line.split_whitespace();
    let image = parts.next()?;
    let idx = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((image, idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn vocab() -> Vocabulary {
        Vocabulary::from_tokens(["<s>", "</s>", "<pad>", "<unk>", "x", "y", "+"]).unwrap()
    }

    fn write_dataset(dir: &Path, index: &str) {
        fs::write(dir.join(FORMULAS_FILE), "x + y\nx\ny + y + y + y\n").unwrap();
        fs::write(dir.join(Split::Validate.index_file()), index).unwrap();
    }

    #[test]
    fn test_split_parsing() {
        assert_eq!("validate".parse::<Split>().unwrap(), Split::Validate);
        assert_eq!("TEST".parse::<Split>().unwrap(), Split::Test);
        assert!("dev".parse::<Split>().is_err());
        assert_eq!(Split::Train.index_file(), "im2latex_train_filter.lst");
    }

    #[test]
    fn test_load_resolves_images_and_references() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "a.png 1\nb.png 0\n\n");
        let images = Path::new("/imgs");

        let ds = FormulaDataset::load(dir.path(), images, Split::Validate, &vocab(), 64).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.items()[0].image_path, images.join("a.png"));
        assert_eq!(ds.items()[0].reference, vec![4]);
        assert_eq!(ds.items()[1].reference, vec![4, 6, 5]);
        assert_eq!(ds.items()[1].index, 1);
    }

    #[test]
    fn test_load_filters_long_formulas() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "a.png 2\nb.png 1\n");

        let ds =
            FormulaDataset::load(dir.path(), dir.path(), Split::Validate, &vocab(), 3).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.filtered(), 1);
        assert_eq!(ds.items()[0].index, 0);
    }

    #[test]
    fn test_malformed_line_is_config_error() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "a.png one\n");
        let err = FormulaDataset::load(dir.path(), dir.path(), Split::Validate, &vocab(), 64)
            .unwrap_err();
        assert!(matches!(err, EvalError::ConfigError { .. }));
    }

    #[test]
    fn test_out_of_range_index_is_config_error() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "a.png 9\n");
        let err = FormulaDataset::load(dir.path(), dir.path(), Split::Validate, &vocab(), 64)
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_missing_split_file_is_config_error() {
        let dir = tempdir().unwrap();
        write_dataset(dir.path(), "a.png 0\n");
        let result = FormulaDataset::load(dir.path(), dir.path(), Split::Test, &vocab(), 64);
        assert!(matches!(result, Err(EvalError::ConfigError { .. })));
    }

    #[test]
    fn test_from_items_reindexes() {
        let item = DatasetItem {
            index: 7,
            image_path: PathBuf::from("a.png"),
            reference: vec![4],
        };
        let ds = FormulaDataset::from_items(Split::Test, vec![item.clone(), item]);
        assert_eq!(ds.items()[1].index, 1);
    }
}
