use std::collections::HashMap;

use color_eyre::eyre::{self, OptionExt as _, bail};
use quickdex_core::{
    config::Config,
    display::format_usd,
    swap::{SWAP_FEE_BPS, TradeQuote, TradeSummary, TradeType, realized_lp_fee},
    token::{Token, TokenAmount},
};

use crate::context::{analytics, parse_id};

#[derive(clap::Args, Debug)]
pub(crate) struct SwapSummary {
    /// Input token address
    #[arg(long)]
    from: String,

    /// Output token address
    #[arg(long)]
    to: String,

    /// Intermediate tokens of the route, in order
    #[arg(long)]
    via: Vec<String>,

    /// Input amount of the quote, in whole tokens
    #[arg(long)]
    amount_in: String,

    /// Output amount of the quote, in whole tokens
    #[arg(long)]
    amount_out: String,

    /// Price impact of the quote, in percent
    #[arg(long)]
    price_impact: f64,

    /// The output amount is fixed and the input may vary
    #[arg(long)]
    exact_output: bool,

    /// Slippage tolerance in basis points; defaults to the configured value
    #[arg(long)]
    slippage_bps: Option<u64>,
}

impl SwapSummary {
    pub(crate) async fn run(&self, config: &Config) -> eyre::Result<()> {
        let route_ids = std::iter::once(&self.from)
            .chain(&self.via)
            .chain(std::iter::once(&self.to))
            .map(|raw| parse_id(raw))
            .collect::<eyre::Result<Vec<_>>>()?;

        let mut unique = route_ids.clone();
        unique.sort();
        unique.dedup();
        let known: HashMap<_, _> = analytics(config)
            .token_prices(&unique)
            .await?
            .into_iter()
            .map(|(fields, price)| {
                let token = Token::new(fields.id.to_address(), &fields.symbol, &fields.name, fields.decimals);
                (fields.id, (token, price))
            })
            .collect();

        let route = route_ids
            .iter()
            .map(|id| {
                known
                    .get(id)
                    .map(|(token, _)| token.clone())
                    .ok_or_eyre(format!("token {id} not indexed"))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        let (Some(input_token), Some(output_token)) = (route.first(), route.last()) else {
            bail!("empty route");
        };

        let input = TokenAmount::parse(input_token, &self.amount_in)
            .ok_or_eyre(format!("invalid input amount `{}`", self.amount_in))?;
        let output = TokenAmount::parse(output_token, &self.amount_out)
            .ok_or_eyre(format!("invalid output amount `{}`", self.amount_out))?;
        let fee = realized_lp_fee(&input, route.len() - 1, SWAP_FEE_BPS);
        let trade_type = if self.exact_output {
            TradeType::ExactOutput
        } else {
            TradeType::ExactInput
        };

        let quote = TradeQuote::new(trade_type, input, output, route.clone(), self.price_impact, fee)?;
        let summary = TradeSummary::new(&quote, self.slippage_bps.unwrap_or(config.slippage_bps));
        println!("{summary}");

        let input_price = route_ids.first().and_then(|id| known.get(id)).map(|(_, price)| *price);
        println!(
            "Input value: {}",
            format_usd(input_price.map(|price| quote.input().to_f64() * price))
        );
        Ok(())
    }
}
