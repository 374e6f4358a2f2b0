use alloy::{primitives::Address, providers::DynProvider};
use color_eyre::eyre::{self, Context as _};
use quickdex_core::{
    chain::Chain,
    config::{Config, ONE_DAY_SECONDS},
    display::{LOADING, format_compact, format_percent, format_usd, format_with_commas, price_color},
    farm::{FarmLoader, total_daily_rewards_usd},
    lair::{lair_apy, read_lair},
    subgraph::SubgraphId,
};
use serde_json::json;
use tracing::warn;

use crate::context::{analytics, read_provider, unix_now};

#[derive(clap::Args, Debug)]
pub(crate) struct Health {}

impl Health {
    pub(crate) async fn run(&self, config: &Config, chain: &Chain) -> eyre::Result<()> {
        let health = analytics(config).health(&config.chain.subgraph_name).await?;
        let behind = chain.block_time() * u32::try_from(health.lag()).unwrap_or(u32::MAX);

        println!("subgraph:  {}", config.chain.subgraph_name);
        println!("synced:    {}", health.synced);
        println!("healthy:   {}", health.healthy);
        println!(
            "indexed:   block {} of {} ({} blocks, ~{} behind)",
            health.latest_block,
            health.chain_head_block,
            health.lag(),
            humantime::format_duration(behind)
        );
        Ok(())
    }
}

#[derive(clap::Args, Debug)]
pub(crate) struct Global {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

impl Global {
    pub(crate) async fn run(&self, config: &Config, chain: &Chain) -> eyre::Result<()> {
        let now = unix_now()?;
        let stats = analytics(config).global_data(now).await?;
        let provider = read_provider(chain)?;

        let dquick = dquick_apy(config, &provider, stats.one_day_volume_usd)
            .await
            .inspect_err(|err| warn!("lair APY unavailable: {err:#}"))
            .ok()
            .flatten();
        let rewards_usd = daily_rewards_usd(config, provider, now)
            .await
            .inspect_err(|err| warn!("farm rewards unavailable: {err:#}"))
            .ok();

        if self.json {
            let out = json!({
                "global": stats,
                "dquick_apy": dquick,
                "daily_rewards_usd": rewards_usd,
            });
            println!("{}", serde_json::to_string_pretty(&out).wrap_err("failed to encode stats")?);
            return Ok(());
        }

        println!(
            "liquidity:  ${} ({} {})",
            format_compact(stats.total_liquidity_usd),
            format_percent(Some(stats.liquidity_change_usd)),
            price_color(stats.liquidity_change_usd)
        );
        println!(
            "volume 24h: ${} ({} {})",
            format_compact(stats.one_day_volume_usd),
            format_percent(Some(stats.volume_change_usd)),
            price_color(stats.volume_change_usd)
        );
        println!(
            "txns 24h:   {} ({})",
            stats.one_day_txns,
            format_percent(Some(stats.txns_change))
        );
        println!("pairs:      {}", stats.pair_count);
        println!("rewards/d:  {}", format_usd(rewards_usd));
        println!(
            "dQUICK APY: {}",
            dquick.map_or_else(|| LOADING.to_string(), |apy| format!("{}%", format_with_commas(apy, 2)))
        );
        Ok(())
    }
}

/// `None` when the lair has no supply or QUICK has no price yet.
async fn dquick_apy(config: &Config, provider: &DynProvider, one_day_volume_usd: f64) -> eyre::Result<Option<f64>> {
    let reads = read_lair(provider, config.lair.address).await?;
    let quick = SubgraphId::from(config.lair.quick_token);
    let Some((_, quick_price)) = analytics(config).token_prices(&[quick]).await?.into_iter().next() else {
        return Ok(None);
    };
    Ok(lair_apy(&reads.info(one_day_volume_usd, quick_price)))
}

/// USD value of the rewards all configured farms emit per day.
async fn daily_rewards_usd(config: &Config, provider: DynProvider, now: u64) -> eyre::Result<f64> {
    let loader = FarmLoader::new(provider, analytics(config), Address::ZERO);
    let farms = loader.load(&config.farms, now).await?;
    Ok(total_daily_rewards_usd(farms.iter().map(|f| &f.pool)))
}

#[derive(clap::Args, Debug)]
pub(crate) struct GlobalChart {
    #[arg(long, default_value_t = 30)]
    days: u64,
}

impl GlobalChart {
    pub(crate) async fn run(&self, config: &Config) -> eyre::Result<()> {
        let start = unix_now()?.saturating_sub(self.days * ONE_DAY_SECONDS);
        for day in analytics(config).global_chart(start).await? {
            println!(
                "{} vol {:>10} liq {:>10}",
                day.date,
                format_compact(day.daily_volume_usd),
                format_compact(day.total_liquidity_usd)
            );
        }
        Ok(())
    }
}
