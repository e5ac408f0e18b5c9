//! On-disk tensor cache for prepared datasets.
//!
//! Layout: `{root}/{data_version}/`
//! - `{train,val,test}_{features,labels}.bin`: bincode-encoded ndarray tensors
//! - `feature_stats.json`: per-channel mean/std fitted on train
//! - `anchors.bin`: anchor bar index of every row
//! - `meta.json`: shapes, sizes, label policy and the bar-series hash
//!
//! Every file is written to `.tmp` and renamed into place. A rewrite removes
//! `meta.json` first and writes it last, so an entry without it is
//! incomplete and treated as absent.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use ndarray::{Array2, Array3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::normalize::FeatureStats;
use super::partition::{Dataset, Partition};
use super::{ExampleConfig, LabelPolicy};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cache entry at {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tensor encoding error on {path}: {source}")]
    Tensor {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("stale cache entry: {0}")]
    Stale(String),
}

/// Sidecar describing one cached dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub data_version: String,
    pub num_features: usize,
    pub time_steps: usize,
    pub num_outputs: usize,
    pub label_policy: LabelPolicy,
    pub train_len: usize,
    pub train_chronological_len: usize,
    pub val_len: usize,
    pub test_len: usize,
    pub test_start_index: usize,
    pub bar_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnchorIndex {
    train: Vec<usize>,
    val: Vec<usize>,
    test: Vec<usize>,
}

pub struct TensorCache {
    root: PathBuf,
}

impl TensorCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_dir(&self, data_version: &str) -> PathBuf {
        self.root.join(data_version)
    }

    pub fn meta_path(&self, data_version: &str) -> PathBuf {
        self.entry_dir(data_version).join("meta.json")
    }

    pub fn read_meta(&self, data_version: &str) -> Result<CacheMeta, CacheError> {
        let path = self.meta_path(data_version);
        if !path.exists() {
            return Err(CacheError::NotFound(self.entry_dir(data_version)));
        }
        read_json(&path)
    }

    /// Persist `dataset` under `data_version`, replacing any previous entry.
    pub fn store(
        &self,
        data_version: &str,
        dataset: &Dataset,
        bar_hash: &str,
    ) -> Result<CacheMeta, CacheError> {
        let dir = self.entry_dir(data_version);
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        // Invalidate the previous entry before any of its files change.
        let meta_path = self.meta_path(data_version);
        match fs::remove_file(&meta_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Io {
                    path: meta_path,
                    source,
                })
            }
        }

        for (name, partition) in [
            ("train", &dataset.train),
            ("val", &dataset.val),
            ("test", &dataset.test),
        ] {
            write_bincode(&dir.join(format!("{name}_features.bin")), &partition.features)?;
            write_bincode(&dir.join(format!("{name}_labels.bin")), &partition.labels)?;
        }
        write_json(&dir.join("feature_stats.json"), &dataset.stats)?;
        write_bincode(
            &dir.join("anchors.bin"),
            &AnchorIndex {
                train: dataset.train.anchors.clone(),
                val: dataset.val.anchors.clone(),
                test: dataset.test.anchors.clone(),
            },
        )?;

        let meta = CacheMeta {
            data_version: data_version.to_string(),
            num_features: dataset.train.num_features(),
            time_steps: dataset.train.time_steps(),
            num_outputs: dataset.train.num_outputs(),
            label_policy: dataset.label_policy,
            train_len: dataset.train.len(),
            train_chronological_len: dataset.train_chronological_len,
            val_len: dataset.val.len(),
            test_len: dataset.test.len(),
            test_start_index: dataset.test_start_index,
            bar_hash: bar_hash.to_string(),
            created_at: chrono::Local::now().naive_local(),
        };
        write_json(&self.meta_path(data_version), &meta)?;
        debug!(dir = %dir.display(), "cached dataset");
        Ok(meta)
    }

    /// Load a cached dataset and check it against the current configuration
    /// and bar series. `test_start_index` is recomputed from the cached
    /// partition sizes.
    pub fn load(
        &self,
        data_version: &str,
        config: &ExampleConfig,
        bar_hash: &str,
    ) -> Result<Dataset, CacheError> {
        let meta = self.read_meta(data_version)?;
        if meta.bar_hash != bar_hash {
            return Err(CacheError::Stale("bar series changed since caching".into()));
        }
        if meta.label_policy != config.label_policy {
            return Err(CacheError::Stale(format!(
                "label policy {:?} does not match configured {:?}",
                meta.label_policy, config.label_policy
            )));
        }
        let expected = (config.num_features(), config.time_steps, config.num_outputs());
        if (meta.num_features, meta.time_steps, meta.num_outputs) != expected {
            return Err(CacheError::Stale(format!(
                "cached shape {:?} does not match configured {expected:?}",
                (meta.num_features, meta.time_steps, meta.num_outputs)
            )));
        }

        let dir = self.entry_dir(data_version);
        let anchors: AnchorIndex = read_bincode(&dir.join("anchors.bin"))?;
        let train = load_partition(&dir, "train", anchors.train, meta.train_len, expected)?;
        let val = load_partition(&dir, "val", anchors.val, meta.val_len, expected)?;
        let test = load_partition(&dir, "test", anchors.test, meta.test_len, expected)?;
        let stats: FeatureStats = read_json(&dir.join("feature_stats.json"))?;
        if stats.num_features() != config.num_features() {
            return Err(CacheError::Stale("feature statistics have the wrong width".into()));
        }

        Ok(Dataset {
            train,
            val,
            test,
            stats,
            label_policy: meta.label_policy,
            train_chronological_len: meta.train_chronological_len,
            test_start_index: config.test_start_index(meta.train_chronological_len, meta.val_len),
        })
    }

    pub fn remove(&self, data_version: &str) -> Result<(), CacheError> {
        let dir = self.entry_dir(data_version);
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir).map_err(|source| CacheError::Io { path: dir, source })
    }
}

fn load_partition(
    dir: &Path,
    name: &str,
    anchors: Vec<usize>,
    expected_len: usize,
    (num_features, time_steps, num_outputs): (usize, usize, usize),
) -> Result<Partition, CacheError> {
    let features: Array3<f64> = read_bincode(&dir.join(format!("{name}_features.bin")))?;
    let labels: Array2<f64> = read_bincode(&dir.join(format!("{name}_labels.bin")))?;
    if features.dim() != (expected_len, num_features, time_steps)
        || labels.dim() != (expected_len, num_outputs)
        || anchors.len() != expected_len
    {
        return Err(CacheError::Stale(format!(
            "{name} tensors have shapes {:?} / {:?} with {} anchors, expected {expected_len} rows",
            features.shape(),
            labels.shape(),
            anchors.len()
        )));
    }
    Ok(Partition {
        features,
        labels,
        anchors,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn commit(tmp: &Path, path: &Path) -> Result<(), CacheError> {
    fs::rename(tmp, path).map_err(|source| {
        let _ = fs::remove_file(tmp);
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn create(path: &Path) -> Result<BufWriter<File>, CacheError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn open(path: &Path) -> Result<BufReader<File>, CacheError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn flush(mut writer: BufWriter<File>, path: &Path) -> Result<(), CacheError> {
    writer.flush().map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let tmp = tmp_path(path);
    let mut writer = create(&tmp)?;
    bincode::serialize_into(&mut writer, value).map_err(|source| CacheError::Tensor {
        path: path.to_path_buf(),
        source,
    })?;
    flush(writer, &tmp)?;
    commit(&tmp, path)
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    bincode::deserialize_from(open(path)?).map_err(|source| CacheError::Tensor {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let tmp = tmp_path(path);
    let mut writer = create(&tmp)?;
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| CacheError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    flush(writer, &tmp)?;
    commit(&tmp, path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CacheError> {
    serde_json::from_reader(open(path)?).map_err(|source| CacheError::Json {
        path: path.to_path_buf(),
        source,
    })
}
