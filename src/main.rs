use anyhow::Context;
use taxlot::pipeline::load_exchange_dir;
use taxlot::{adapter_for, config::Config, output, AppError, RateTable, TaxPipeline};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;

    let rates = RateTable::from_path(&config.rates_path)
        .with_context(|| format!("loading rates from {}", config.rates_path.display()))?;
    match rates.latest_date() {
        Some(latest) => tracing::info!(%latest, "exchange rates loaded"),
        None => tracing::warn!("exchange rate table is empty"),
    }

    let mut inputs = Vec::new();
    for exchange in &config.exchanges {
        let adapter =
            adapter_for(exchange).ok_or_else(|| AppError::UnknownExchange(exchange.clone()))?;
        let dir = config.data_dir.join(exchange);
        let loaded = load_exchange_dir(adapter.as_ref(), &dir)?;
        tracing::info!(
            exchange = %exchange,
            trades = loaded.trades.len(),
            rejected = loaded.rejected.len(),
            "parsed exports"
        );
        inputs.push(loaded);
    }

    let run = TaxPipeline::new(&rates, config.normalizer_settings())
        .with_balance_replay(config.balance_replay)
        .run(inputs)?;

    for (year, totals) in &run.matrix.years {
        tracing::info!(
            year,
            short_term = %totals.short_term,
            long_term = %totals.long_term,
            total = %totals.total(),
            "realized pnl"
        );
    }

    output::write_all(&run, &config.output_dir)?;

    if !run.ledger.is_complete() {
        anyhow::bail!(
            "{} currencies oversold; see {}",
            run.ledger.failures.len(),
            config.output_dir.join(output::ERRORS_FILE).display()
        );
    }
    Ok(())
}
