use clap::Subcommand;
use color_eyre::eyre::{self, Context as _};
use quickdex_core::{
    analytics::PairStats,
    config::Config,
    display::{format_compact, format_percent},
};

use crate::context::{analytics, parse_id, unix_now};

#[derive(Subcommand, Debug)]
pub(crate) enum Pairs {
    /// Pairs containing any of the given tokens, or with the given pair address
    Search {
        /// Token addresses
        tokens: Vec<String>,

        #[arg(long)]
        pair: Option<String>,
    },

    /// The deepest pairs by liquidity
    Top {
        #[arg(long, default_value_t = 20)]
        count: usize,
    },

    /// Liquidity, 24h volume and fee APY of pairs
    Info {
        #[arg(required = true)]
        pairs: Vec<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Pairs {
    pub(crate) async fn run(&self, config: &Config) -> eyre::Result<()> {
        let analytics = analytics(config);

        match self {
            Pairs::Search { tokens, pair } => {
                let tokens = tokens.iter().map(|t| parse_id(t)).collect::<eyre::Result<Vec<_>>>()?;
                let pair = pair.as_deref().map(parse_id).transpose()?;
                for p in analytics.search_pairs(&tokens, pair.as_ref()).await? {
                    println!("{}-{}  {}", p.token0.symbol, p.token1.symbol, p.id);
                }
            }
            Pairs::Info { pairs, json } => {
                let ids = pairs.iter().map(|p| parse_id(p)).collect::<eyre::Result<Vec<_>>>()?;
                let stats = analytics.bulk_pair_data(&ids, unix_now()?).await?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&stats).wrap_err("failed to encode pairs")?);
                    return Ok(());
                }
                stats.iter().for_each(print_row);
            }
            Pairs::Top { count } => {
                analytics
                    .top_pairs(*count, unix_now()?)
                    .await?
                    .iter()
                    .for_each(print_row);
            }
        }
        Ok(())
    }
}

pub(crate) fn print_row(p: &PairStats) {
    println!(
        "{}-{}  liq ${} ({})  vol 24h ${}  fees 24h ${}  fee apy {}  {}",
        p.token0,
        p.token1,
        format_compact(p.reserve_usd),
        format_percent(Some(p.liquidity_change_usd)),
        format_compact(p.one_day_volume_usd),
        format_compact(p.one_day_fee_usd),
        format_percent(Some(p.fee_apy * 100.0)),
        p.id
    );
}
