use seasonrank::config::{Config, LogFormat};
use seasonrank::error::AppError;
use seasonrank::{
    init_db, PriceSource, RankingOrchestrator, Repository, RunSettings, RunSummary,
    UpbitPriceSource,
};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);

    match run(&config).await {
        Ok(summary) => {
            tracing::info!(
                run_id = %summary.run_id,
                season = %summary.season,
                participants = summary.participants,
                finalized = summary.finalized,
                missing_cash = summary.missing_cash,
                unpriced_positions = summary.unpriced_positions,
                price_feed_failed = summary.price_feed_failed,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "Season ranking updated"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Season ranking failed");
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).init(),
    }
}

async fn run(config: &Config) -> Result<RunSummary, AppError> {
    let pool = init_db(&config.database_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let season = match config.season_id {
        Some(id) => id,
        None => repo
            .current_season()
            .await?
            .ok_or(AppError::NoActiveSeason)?,
    };

    let prices = price_source(&repo, config).await?;
    let orchestrator = RankingOrchestrator::new(repo, prices, RunSettings::from(config));
    Ok(orchestrator.run(season).await?)
}

async fn price_source(
    repo: &Repository,
    config: &Config,
) -> Result<Arc<dyn PriceSource>, AppError> {
    let symbols = repo.active_asset_symbols().await?;
    tracing::debug!(assets = symbols.len(), "Loaded active asset symbols");
    Ok(Arc::new(UpbitPriceSource::new(
        config.price_api_url.clone(),
        config.quote_currency.clone(),
        symbols,
        config.price_fetch_timeout,
    )))
}
