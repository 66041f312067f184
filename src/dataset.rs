//! Genotype/phenotype dataset loading.
//!
//! Tab-separated files, one row per individual. Genotype files carry a
//! header of marker IDs with the sample ID in the first column; phenotype
//! files carry a header of trait names, one of which is selected for the
//! run. Phenotype rows are aligned to the genotype sample order by ID.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: file is empty")]
    Empty { path: String },

    #[error("{path} line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{path} line {line}: unparsable value '{value}'")]
    BadValue {
        path: String,
        line: usize,
        value: String,
    },

    #[error("trait '{0}' not found in phenotype header")]
    UnknownTrait(String),

    #[error("phenotype file is missing sample '{0}' present in the genotype file")]
    MissingSample(String),

    #[error("genotype file has {genotypes} individuals but phenotype file has {phenotypes}")]
    SampleCountMismatch { genotypes: usize, phenotypes: usize },
}

/// One loaded dataset, immutable for the run. Row `i` of `genotypes`,
/// element `i` of `phenotypes` and `sample_ids[i]` all refer to the same
/// individual.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub sample_ids: Vec<String>,
    /// n individuals x p markers, dosage-coded.
    pub genotypes: Array2<f64>,
    /// Selected trait, one value per individual.
    pub phenotypes: Array1<f64>,
}

impl Dataset {
    pub fn n_individuals(&self) -> usize {
        self.genotypes.nrows()
    }

    pub fn n_markers(&self) -> usize {
        self.genotypes.ncols()
    }

    /// Load genotypes and the selected phenotype trait from two TSV files.
    pub fn load(
        genotype_path: &Path,
        phenotype_path: &Path,
        trait_name: &str,
    ) -> Result<Self, DatasetError> {
        let (sample_ids, _marker_ids, genotypes) = load_genotypes(genotype_path)?;
        let phenotypes = load_phenotypes(phenotype_path, trait_name, &sample_ids)?;
        if phenotypes.len() != genotypes.nrows() {
            return Err(DatasetError::SampleCountMismatch {
                genotypes: genotypes.nrows(),
                phenotypes: phenotypes.len(),
            });
        }
        info!(
            "Loaded dataset: {} individuals x {} markers, trait '{}'",
            genotypes.nrows(),
            genotypes.ncols(),
            trait_name
        );
        Ok(Self {
            sample_ids,
            genotypes,
            phenotypes,
        })
    }
}

fn open(path: &Path) -> Result<BufReader<File>, DatasetError> {
    File::open(path).map(BufReader::new).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn read_lines(path: &Path) -> Result<Vec<String>, DatasetError> {
    let reader = open(path)?;
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    if lines.len() < 2 {
        return Err(DatasetError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(lines)
}

/// Read a genotype TSV: header `ID\t<marker>...`, one dosage row per sample.
pub fn load_genotypes(
    path: &Path,
) -> Result<(Vec<String>, Vec<String>, Array2<f64>), DatasetError> {
    let path_str = path.display().to_string();
    let lines = read_lines(path)?;

    let header: Vec<&str> = lines[0].split('\t').collect();
    let marker_ids: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
    let p = marker_ids.len();

    let mut sample_ids = Vec::with_capacity(lines.len() - 1);
    let mut values = Vec::with_capacity((lines.len() - 1) * p);
    for (row, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != p + 1 {
            return Err(DatasetError::FieldCount {
                path: path_str.clone(),
                line: row + 2,
                expected: p + 1,
                found: fields.len(),
            });
        }
        sample_ids.push(fields[0].to_string());
        for field in &fields[1..] {
            let value = field.parse::<f64>().map_err(|_| DatasetError::BadValue {
                path: path_str.clone(),
                line: row + 2,
                value: field.to_string(),
            })?;
            values.push(value);
        }
    }

    let n = sample_ids.len();
    let genotypes = Array2::from_shape_vec((n, p), values).map_err(|_| DatasetError::Empty {
        path: path_str,
    })?;
    Ok((sample_ids, marker_ids, genotypes))
}

/// Read the selected trait column from a phenotype TSV, reordered to match
/// `sample_order`.
pub fn load_phenotypes(
    path: &Path,
    trait_name: &str,
    sample_order: &[String],
) -> Result<Array1<f64>, DatasetError> {
    let path_str = path.display().to_string();
    let lines = read_lines(path)?;

    let header: Vec<&str> = lines[0].split('\t').collect();
    let trait_col = header[1..]
        .iter()
        .position(|&name| name == trait_name)
        .map(|i| i + 1)
        .ok_or_else(|| DatasetError::UnknownTrait(trait_name.to_string()))?;

    let mut by_sample: HashMap<String, f64> = HashMap::with_capacity(lines.len() - 1);
    for (row, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() <= trait_col {
            return Err(DatasetError::FieldCount {
                path: path_str.clone(),
                line: row + 2,
                expected: trait_col + 1,
                found: fields.len(),
            });
        }
        let value = fields[trait_col]
            .parse::<f64>()
            .map_err(|_| DatasetError::BadValue {
                path: path_str.clone(),
                line: row + 2,
                value: fields[trait_col].to_string(),
            })?;
        by_sample.insert(fields[0].to_string(), value);
    }

    let mut ordered = Vec::with_capacity(sample_order.len());
    for id in sample_order {
        match by_sample.get(id) {
            Some(&value) => ordered.push(value),
            None => return Err(DatasetError::MissingSample(id.clone())),
        }
    }
    Ok(Array1::from_vec(ordered))
}
