//! Dataset preparation: load from the tensor cache or build from bars.

use anyhow::{Context, Result};
use tracing::{info, warn};

use signallab_core::dataset::{
    CacheError, Dataset, DatasetSplitter, ExampleBuilder, TensorCache,
};
use signallab_core::domain::BarSeries;
use signallab_core::engine::MarketView;
use signallab_core::indicators::IndicatorSet;

use crate::config::PipelineConfig;

/// Everything a simulation needs: the bars, their indicators and the
/// partitioned dataset.
#[derive(Debug)]
pub struct PreparedData {
    pub bars: BarSeries,
    pub indicators: IndicatorSet,
    pub dataset: Dataset,
    pub cache_hit: bool,
}

impl PreparedData {
    /// Market view starting at the first test example.
    pub fn market(&self) -> Result<MarketView<'_>> {
        MarketView::new(&self.bars, &self.indicators, self.dataset.test_start_index)
            .context("indicators do not line up with the bar series")
    }
}

/// Load the dataset for `config.data_version` from the cache, or build,
/// split and cache it.
///
/// Indicators are always computed from `bars` since the engine needs them
/// either way. A cache entry that is missing, unreadable or stale is
/// rebuilt; a failure to write the rebuilt entry only logs a warning.
pub fn prepare_dataset(config: &PipelineConfig, bars: BarSeries) -> Result<PreparedData> {
    config.validate().context("invalid pipeline config")?;

    let indicators = IndicatorSet::compute(&bars, &config.indicators);
    let bar_hash = bars.content_hash();
    let cache = TensorCache::new(&config.cache_dir);

    match cache.load(&config.data_version, &config.examples, &bar_hash) {
        Ok(dataset) => {
            info!(
                version = %config.data_version,
                train = dataset.train.len(),
                val = dataset.val.len(),
                test = dataset.test.len(),
                test_start_index = dataset.test_start_index,
                "cache hit"
            );
            return Ok(PreparedData {
                bars,
                indicators,
                dataset,
                cache_hit: true,
            });
        }
        Err(CacheError::NotFound(dir)) => {
            info!(dir = %dir.display(), "cache miss");
        }
        Err(err) => {
            warn!(version = %config.data_version, error = %err, "cache unusable, rebuilding");
        }
    }

    let dataset = build_dataset(config, &bars, &indicators)?;

    if let Err(err) = cache.store(&config.data_version, &dataset, &bar_hash) {
        warn!(version = %config.data_version, error = %err, "failed to cache dataset");
    }

    Ok(PreparedData {
        bars,
        indicators,
        dataset,
        cache_hit: false,
    })
}

/// Build and split examples without touching the cache.
pub fn build_dataset(
    config: &PipelineConfig,
    bars: &BarSeries,
    indicators: &IndicatorSet,
) -> Result<Dataset> {
    let examples = ExampleBuilder::new(bars, indicators, &config.examples)
        .build_all()
        .context("failed to build examples")?;
    info!(examples = examples.len(), bars = bars.len(), "built examples");

    DatasetSplitter::new(
        config.examples.clone(),
        config.split.clone(),
        config.data_version.clone(),
    )
    .split(&examples)
    .context("failed to split examples")
}
