use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre;
use quickdex_core::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{farm, market, pairs, swap, tokens};

#[derive(Parser)]
#[command(name = "quickdex", about)]
pub(crate) struct Cli {
    /// Log more; repeat for debug and trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show indexing status of the exchange subgraph
    Health(market::Health),

    /// Exchange-wide volume, liquidity, farm rewards and dQUICK APY
    Global(market::Global),

    /// Daily exchange-wide volume and liquidity
    #[command(name = "global-chart")]
    GlobalChart(market::GlobalChart),

    /// Search, rank and inspect tokens
    #[command(subcommand)]
    Tokens(tokens::Tokens),

    /// Search, rank and inspect pairs
    #[command(subcommand)]
    Pairs(pairs::Pairs),

    /// List staking pools and stake, unstake or claim rewards
    #[command(subcommand)]
    Farm(farm::Farm),

    /// Summarize a trade: slippage bound, price impact, LP fee and route
    #[command(name = "swap-summary")]
    SwapSummary(swap::SwapSummary),
}

impl Cli {
    pub(crate) async fn run(self, config: Config, shutdown_token: CancellationToken) -> eyre::Result<()> {
        let chain = config.build_chain()?;
        info!(chain.name = %chain.name, chain.id = chain.chain_id(), "🔗 using chain");

        match self.command {
            Commands::Health(cmd) => cmd.run(&config, &chain).await,
            Commands::Global(cmd) => cmd.run(&config, &chain).await,
            Commands::GlobalChart(cmd) => cmd.run(&config).await,
            Commands::Tokens(cmd) => cmd.run(&config).await,
            Commands::Pairs(cmd) => cmd.run(&config).await,
            Commands::Farm(cmd) => cmd.run(&config, &chain, shutdown_token).await,
            Commands::SwapSummary(cmd) => cmd.run(&config).await,
        }
    }
}
