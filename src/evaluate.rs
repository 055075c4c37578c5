use crate::blocks::{load_price_series, wei_to_gwei};
use crate::config::EvaluateConfig;
use crate::forecasts::{load_forecasts, ForecastSeries};
use crate::predictors::{build_predictor, PredictorSettings};
use crate::prices::PriceSeries;
use crate::report::{write_report, Report, RunConfig};
use crate::results::ResultAggregate;
use crate::simulator::InclusionSimulator;
use crate::types::{BlockBounds, PredictorKind};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs every configured simulation and returns the written report paths.
pub async fn run_evaluation(config: &EvaluateConfig) -> Result<Vec<PathBuf>> {
    let prices = Arc::new(load_price_series(&config.prices).await?);

    let forecasts = match &config.settings.forecasts {
        Some(path) => Some(Arc::new(load_forecasts(path).await?)),
        None => None,
    };

    let bounds = block_bounds(&prices, config.skip_start, config.skip_end)?;
    check_predictor_bounds(&config.predictor, &config.settings, &prices, bounds)?;

    info!(
        predictor = %config.predictor,
        bounds = %bounds,
        "Running evaluation"
    );

    let mut reports = Vec::new();
    for utility in run_utilities(config) {
        let results = simulate(config, prices.clone(), forecasts.clone(), bounds, utility)
            .await
            .with_context(|| format!("Simulating {} over blocks {}", config.predictor, bounds))?;

        log_summary(&config.predictor, utility, &results);

        let run_config = RunConfig {
            evaluation: config,
            bounds,
            run_utility: utility,
        };
        let report = Report::new(run_config, results.summary())?;
        let path = write_report(&config.output, &report).await?;

        info!(path = %path.display(), "Wrote report");
        reports.push(path);
    }

    Ok(reports)
}

/// Start after `skip_start` blocks, stop submitting `skip_end` blocks before the
/// last known block and give up on pending transactions at the last block.
pub fn block_bounds(prices: &PriceSeries, skip_start: u64, skip_end: u64) -> Result<BlockBounds> {
    let (first, last) = prices
        .first_block()
        .zip(prices.last_block())
        .ok_or(anyhow!("Price series is empty"))?;

    let start = first.saturating_add(skip_start);
    let end = last.checked_sub(skip_end).ok_or(anyhow!(
        "Cannot skip {} blocks before block {}",
        skip_end,
        last
    ))?;

    if start > end {
        return Err(anyhow!(
            "Skipping {} + {} blocks leaves nothing to simulate between blocks {} and {}",
            skip_start,
            skip_end,
            first,
            last
        ));
    }

    Ok(BlockBounds { start, end, last })
}

/// Rejects bounds the predictor cannot serve before any simulation starts.
pub fn check_predictor_bounds(
    kind: &PredictorKind,
    settings: &PredictorSettings,
    prices: &PriceSeries,
    bounds: BlockBounds,
) -> Result<()> {
    match kind {
        PredictorKind::Clairvoyant => {
            let window_end = bounds.end.checked_add(settings.blocks_to_wait);
            if window_end.map_or(true, |window_end| window_end > bounds.last) {
                return Err(anyhow!(
                    "Clairvoyant predictor looks {} blocks ahead but block {} is only {} blocks before the last block {}, raise skip_end to at least {}",
                    settings.blocks_to_wait,
                    bounds.end,
                    bounds.last - bounds.end,
                    bounds.last,
                    settings.blocks_to_wait
                ));
            }
        }
        PredictorKind::PercentileWindow => {
            if prices.prices_before(bounds.start).next().is_none() {
                return Err(anyhow!(
                    "PercentileWindow predictor needs prices before the first simulated block {}, raise skip_start",
                    bounds.start
                ));
            }
        }
        PredictorKind::ModelBased => {}
    }

    Ok(())
}

/// One run per configured utility. The utility only affects the model predictor.
fn run_utilities(config: &EvaluateConfig) -> Vec<Option<f64>> {
    let utilities = &config.settings.utility;

    if utilities.is_empty() {
        return vec![None];
    }

    if config.predictor != PredictorKind::ModelBased {
        warn!(
            "Utility is ignored by the {} predictor, running once",
            config.predictor
        );
        return vec![None];
    }

    utilities.iter().copied().map(Some).collect()
}

/// Runs one simulation off the async runtime with a freshly built predictor.
async fn simulate(
    config: &EvaluateConfig,
    prices: Arc<PriceSeries>,
    forecasts: Option<Arc<ForecastSeries>>,
    bounds: BlockBounds,
    utility: Option<f64>,
) -> Result<ResultAggregate> {
    let kind = config.predictor.clone();
    let settings = config.settings.clone();

    tokio::task::spawn_blocking(move || -> Result<ResultAggregate> {
        let predictor = build_predictor(
            &kind,
            &settings,
            &prices,
            forecasts.as_deref(),
            utility,
        )?;

        let results = InclusionSimulator::new(&prices, predictor).simulate(
            bounds.start,
            bounds.end,
            bounds.last,
        )?;

        Ok(results)
    })
    .await?
}

fn log_summary(kind: &PredictorKind, utility: Option<f64>, results: &ResultAggregate) {
    let gwei = |wei: Option<f64>| wei.and_then(|wei| wei_to_gwei(wei).ok());

    info!(
        predictor = %kind,
        utility = ?utility,
        total_count = results.total_count(),
        included_count = results.included_count(),
        not_included_count = results.not_included_count(),
        average_gas_price_gwei = ?gwei(results.average_price().ok()),
        median_gas_price_gwei = ?gwei(results.median_price().ok()),
        average_gas_price_diff_gwei = ?gwei(results.average_price_diff().ok()),
        average_blocks_waited = ?results.average_blocks_waited().ok(),
        "Evaluation finished"
    );
}
