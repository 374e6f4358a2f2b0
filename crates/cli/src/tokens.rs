use clap::Subcommand;
use color_eyre::eyre::{self, Context as _, OptionExt as _};
use quickdex_core::{
    analytics::{TokenStats, top_movers},
    config::{Config, ONE_DAY_SECONDS},
    display::{format_compact, format_number, format_percent, format_usd, price_color},
};

use crate::{
    context::{analytics, parse_id, unix_now},
    pairs,
};

#[derive(Subcommand, Debug)]
pub(crate) enum Tokens {
    /// Find tokens by symbol, name or address
    Search {
        text: String,
    },

    /// The most traded tokens with prices and 24h changes
    Top {
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// The most traded tokens with their 24h price moves
    Movers {
        #[arg(long, default_value_t = 5)]
        n: usize,
    },

    /// Price, volume and liquidity of one token
    Info {
        token: String,
    },

    /// Daily price history of one token
    Chart {
        token: String,

        #[arg(long, default_value_t = 30)]
        days: u64,
    },

    /// Intraday USD price of one token, sampled at fixed intervals
    History {
        token: String,

        #[arg(long, default_value_t = 24)]
        hours: u64,

        #[arg(long, default_value_t = 60)]
        interval_minutes: u64,
    },

    /// Pairs trading one token, deepest first
    Pairs {
        token: String,
    },
}

fn print_row(t: &TokenStats) {
    println!(
        "{:<10} {:>14} {:>9} {:<7} vol {:>10} liq {:>10}  {}",
        t.symbol,
        format_usd(Some(t.price_usd)),
        format_percent(Some(t.price_change_usd)),
        price_color(t.price_change_usd),
        format_compact(t.one_day_volume_usd),
        format_compact(t.total_liquidity_usd),
        t.id
    );
}

impl Tokens {
    pub(crate) async fn run(&self, config: &Config) -> eyre::Result<()> {
        let analytics = analytics(config);
        let now = unix_now()?;

        match self {
            Tokens::Search { text } => {
                let found = analytics.search_tokens(text).await?;
                if found.is_empty() {
                    println!("no tokens match `{text}`");
                }
                for t in found {
                    println!(
                        "{:<10} {:<30} liq {:>12}  {}",
                        t.symbol,
                        t.name,
                        format_number(t.total_liquidity, 2),
                        t.id
                    );
                }
            }
            Tokens::Top { count, json } => {
                let eth = analytics.eth_price(now).await?;
                let tokens = analytics.top_tokens(&eth, now, *count).await?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&tokens).wrap_err("failed to encode tokens")?);
                } else {
                    tokens.iter().for_each(print_row);
                }
            }
            Tokens::Movers { n } => {
                let eth = analytics.eth_price(now).await?;
                let tokens = analytics.top_tokens(&eth, now, *n).await?;
                let movers = top_movers(&tokens, *n)
                    .ok_or_eyre(format!("only {} tokens known, need {n}", tokens.len()))?;
                movers.into_iter().for_each(print_row);
            }
            Tokens::Info { token } => {
                let id = parse_id(token)?;
                let eth = analytics.eth_price(now).await?;
                let stats = analytics
                    .token_info(&eth, now, &id)
                    .await?
                    .ok_or_eyre(format!("token {id} not indexed"))?;
                print_row(&stats);
                println!("txns 24h: {}", stats.one_day_txns);
            }
            Tokens::History { token, hours, interval_minutes } => {
                let id = parse_id(token)?;
                let step = interval_minutes.saturating_mul(60).max(60);
                let start = now.saturating_sub(hours.saturating_mul(3_600));
                let timestamps = (start..now)
                    .step_by(usize::try_from(step).unwrap_or(usize::MAX))
                    .collect::<Vec<_>>();
                for (timestamp, price) in analytics.price_history(&id, &timestamps).await? {
                    println!("{timestamp} {:>14}", format_usd(Some(price)));
                }
            }
            Tokens::Pairs { token } => {
                let id = parse_id(token)?;
                analytics.token_pairs(&id, now).await?.iter().for_each(pairs::print_row);
            }
            Tokens::Chart { token, days } => {
                let id = parse_id(token)?;
                let start = now.saturating_sub(days * ONE_DAY_SECONDS);
                for day in analytics.token_chart(&id, start).await? {
                    println!(
                        "{} {:>14} vol {:>10} liq {:>10}",
                        day.date,
                        format_usd(Some(day.price_usd)),
                        format_compact(day.daily_volume_usd),
                        format_compact(day.total_liquidity_usd)
                    );
                }
            }
        }
        Ok(())
    }
}
