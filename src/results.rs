//! Replicate-accuracy tables and their persistence.
//!
//! Each model family persists one `outCOR_<MODEL>.tsv` file holding the
//! replicate-ordered sequence of testing-set correlations. The summary step
//! reloads whatever families are present and lays them out side by side.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::accuracy::{summarize, Summary};
use crate::model::ModelFamily;

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no result file for model {0} in the output directory")]
    NotFound(ModelFamily),

    #[error("{path} line {line}: malformed record '{record}'")]
    Malformed {
        path: String,
        line: usize,
        record: String,
    },

    #[error("no result files found for any requested model family")]
    NothingToSummarize,
}

/// Replicate accuracies for one model family, in replicate order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub model: ModelFamily,
    pub accuracies: Vec<f64>,
}

impl ResultTable {
    pub fn file_name(model: ModelFamily) -> String {
        format!("outCOR_{}.tsv", model.name())
    }

    pub fn path_in(dir: &Path, model: ModelFamily) -> PathBuf {
        dir.join(Self::file_name(model))
    }

    pub fn exists(dir: &Path, model: ModelFamily) -> bool {
        Self::path_in(dir, model).is_file()
    }

    /// Write the table as `outCOR_<MODEL>.tsv` under `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ResultError> {
        let path = Self::path_in(dir, self.model);
        let to_err = |source| ResultError::Write {
            path: path.display().to_string(),
            source,
        };
        let mut writer = File::create(&path).map(BufWriter::new).map_err(to_err)?;
        writeln!(writer, "replicate\taccuracy").map_err(to_err)?;
        for (k, accuracy) in self.accuracies.iter().enumerate() {
            writeln!(writer, "{}\t{:.15e}", k + 1, accuracy).map_err(to_err)?;
        }
        writer.flush().map_err(to_err)?;
        info!(
            "Wrote {} replicate accuracies for {} to {}",
            self.accuracies.len(),
            self.model,
            path.display()
        );
        Ok(path)
    }

    /// Load a previously saved table. Missing file is the distinct
    /// [`ResultError::NotFound`] so aggregation can skip it gracefully.
    pub fn load(dir: &Path, model: ModelFamily) -> Result<Self, ResultError> {
        let path = Self::path_in(dir, model);
        if !path.is_file() {
            return Err(ResultError::NotFound(model));
        }
        let path_str = path.display().to_string();
        let reader = File::open(&path).map(BufReader::new).map_err(|source| {
            ResultError::Read {
                path: path_str.clone(),
                source,
            }
        })?;

        let mut accuracies = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ResultError::Read {
                path: path_str.clone(),
                source,
            })?;
            if idx == 0 || line.trim().is_empty() {
                continue; // header
            }
            let value = line
                .split('\t')
                .nth(1)
                .and_then(|field| field.parse::<f64>().ok())
                .ok_or_else(|| ResultError::Malformed {
                    path: path_str.clone(),
                    line: idx + 1,
                    record: line.clone(),
                })?;
            accuracies.push(value);
        }
        Ok(Self { model, accuracies })
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.accuracies)
    }
}

/// Per-family reduction used in the side-by-side comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySummary {
    pub model: ModelFamily,
    pub replicates: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// Load every requested family's persisted table and reduce it.
///
/// Families without a result file are skipped with a warning so a partial
/// result set can still be summarized; only a completely empty set fails.
pub fn summarize_families(
    dir: &Path,
    families: &[ModelFamily],
) -> Result<Vec<FamilySummary>, ResultError> {
    let mut summaries = Vec::with_capacity(families.len());
    for &model in families {
        match ResultTable::load(dir, model) {
            Ok(table) => {
                let s = table.summary();
                summaries.push(FamilySummary {
                    model,
                    replicates: s.n,
                    mean: s.mean,
                    std_dev: s.std_dev,
                });
            }
            Err(ResultError::NotFound(_)) => {
                warn!(
                    "No result file for {} in {}; omitting it from the summary",
                    model,
                    dir.display()
                );
            }
            Err(e) => return Err(e),
        }
    }
    if summaries.is_empty() {
        return Err(ResultError::NothingToSummarize);
    }
    Ok(summaries)
}

/// Render the side-by-side table: one column per family, a mean row and a
/// standard-deviation row.
pub fn render_summary(summaries: &[FamilySummary]) -> String {
    let mut out = String::new();
    out.push_str("statistic");
    for s in summaries {
        out.push('\t');
        out.push_str(s.model.name());
    }
    out.push('\n');

    out.push_str("mean");
    for s in summaries {
        out.push_str(&format!("\t{:.4}", s.mean));
    }
    out.push('\n');

    out.push_str("sd");
    for s in summaries {
        out.push_str(&format!("\t{:.4}", s.std_dev));
    }
    out.push('\n');
    out
}
