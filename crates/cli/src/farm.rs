use alloy::{primitives::Address, providers::DynProvider};
use clap::Subcommand;
use color_eyre::eyre::{self, OptionExt as _, bail};
use quickdex_core::{
    chain::Chain,
    config::{Config, FarmConfig},
    display::{format_token_amount, format_usd},
    farm::{
        FarmLoader, LoadedFarm, apy_with_fee, claim_enabled, derive_stake_amount, earned_usd,
        earned_usd_label, format_apy, per_month_return, pool_reward_rate_label, staked_amounts,
        total_daily_rewards_usd, tvl_label, user_daily_rate,
    },
    subgraph::SubgraphId,
    token::Token,
    tx::{
        AlloyErc20, AlloyStakingRewards, ApprovalState, FarmActions, TransactionDeadline, Wallet,
    },
};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::{analytics, read_provider, signer, unix_now, wallet_provider};

#[derive(Subcommand, Debug)]
pub(crate) enum Farm {
    /// List configured staking pools with TVL, rewards and APY
    List {
        /// Account to show stakes for; defaults to the configured wallet
        #[arg(long)]
        account: Option<Address>,
    },

    /// Stake LP tokens, approving the staking contract first when needed
    Stake {
        /// Staking contract address
        farm: Address,

        /// Amount of LP tokens, in whole tokens
        amount: String,
    },

    /// Withdraw staked LP tokens
    Unstake {
        farm: Address,
        amount: String,
    },

    /// Claim earned rewards
    Claim {
        farm: Address,
    },
}

type Actions = FarmActions<AlloyStakingRewards<DynProvider>, AlloyErc20<DynProvider>>;

impl Farm {
    pub(crate) async fn run(
        &self,
        config: &Config,
        chain: &Chain,
        shutdown_token: CancellationToken,
    ) -> eyre::Result<()> {
        match self {
            Farm::List { account } => {
                let account = match account {
                    Some(account) => *account,
                    None => signer(config)?.address(),
                };
                list(config, chain, account).await
            }
            Farm::Stake { farm, amount } => {
                let session = Session::open(config, chain, *farm).await?;
                let _watch = session.watch_state(shutdown_token);
                session.stake(amount).await
            }
            Farm::Unstake { farm, amount } => {
                let session = Session::open(config, chain, *farm).await?;
                let _watch = session.watch_state(shutdown_token);
                session.unstake(amount).await
            }
            Farm::Claim { farm } => {
                let session = Session::open(config, chain, *farm).await?;
                let _watch = session.watch_state(shutdown_token);
                session.claim().await
            }
        }
    }
}

async fn list(config: &Config, chain: &Chain, account: Address) -> eyre::Result<()> {
    let now = unix_now()?;
    let analytics = analytics(config);
    let pair_ids: Vec<SubgraphId> = config.farms.iter().map(|f| SubgraphId::from(f.pair)).collect();
    let fee_apys = analytics
        .bulk_pair_data(&pair_ids, now)
        .await?
        .into_iter()
        .map(|p| (p.id, p.fee_apy))
        .collect::<std::collections::HashMap<_, _>>();

    let loader = FarmLoader::new(read_provider(chain)?, analytics, account);
    let farms = loader.load(&config.farms, now).await?;

    for LoadedFarm { pool, unstaked_lp } in &farms {
        let staked = staked_amounts(pool, Some(unstaked_lp));
        let fee_apy = fee_apys
            .get(&SubgraphId::from(pool.pair().liquidity_token))
            .copied()
            .unwrap_or_default();
        let apy = staked
            .as_ref()
            .and_then(|s| per_month_return(pool, s))
            .map(|monthly| format_apy(apy_with_fee(monthly, fee_apy)));

        println!(
            "{}{}{}  {}",
            pool.pair(),
            if pool.rewards().is_dual() { " (dual)" } else { "" },
            if pool.is_ended() { " (ended)" } else { "" },
            pool.staking_address
        );
        println!("  tvl:      {}", tvl_label(staked.as_ref()));
        println!("  apy:      {}%", apy.as_deref().unwrap_or("-"));
        for stream in pool.rewards().streams() {
            println!(
                "  rewards:  {} (yours {} {} / day)",
                pool_reward_rate_label(stream),
                user_daily_rate(stream),
                stream.token.symbol
            );
        }
        println!(
            "  staked:   {} LP ({})",
            format_token_amount(Some(&pool.staked_amount)),
            format_usd(staked.as_ref().and_then(|s| s.my_staked_usd))
        );
        println!(
            "  wallet:   {} LP ({})",
            format_token_amount(Some(unstaked_lp)),
            format_usd(staked.as_ref().and_then(|s| s.unstaked_usd))
        );
        println!("  earned:   {}", earned_usd_label(earned_usd(pool)));
    }
    println!(
        "total daily rewards: {}",
        format_usd(Some(total_daily_rewards_usd(farms.iter().map(|f| &f.pool))))
    );
    Ok(())
}

/// One farm loaded for the configured wallet, with actions bound to it.
struct Session {
    provider: DynProvider,
    loaded: LoadedFarm,
    actions: Actions,
    deadline_secs: u64,
}

impl Session {
    async fn open(config: &Config, chain: &Chain, staking_address: Address) -> eyre::Result<Self> {
        let farm: &FarmConfig = config
            .farms
            .iter()
            .find(|f| f.staking_address == staking_address)
            .ok_or_eyre(format!("farm {staking_address} is not configured"))?;

        let signer = signer(config)?;
        let account = signer.address();
        let provider = wallet_provider(chain, signer)?;

        let loader = FarmLoader::new(provider.clone(), analytics(config), account);
        let loaded = loader
            .load(std::slice::from_ref(farm), unix_now()?)
            .await?
            .pop()
            .ok_or_eyre(format!("failed to load farm {staking_address}"))?;

        let wallet = Wallet {
            account,
            staking: AlloyStakingRewards::new(staking_address, provider.clone(), config.gas),
            lp_token: AlloyErc20::new(farm.pair, provider.clone()),
        };
        let actions = FarmActions::new(
            staking_address,
            loaded.pool.lp_token().clone(),
            Some(wallet),
            config.gas.approval_margin_bps,
        );

        Ok(Self {
            provider,
            loaded,
            actions,
            deadline_secs: config.deadline_secs,
        })
    }

    /// Logs every state change until the actions are dropped or shutdown is requested.
    fn watch_state(&self, shutdown_token: CancellationToken) -> tokio::task::JoinHandle<()> {
        let mut rx = self.actions.subscribe();
        tokio::spawn(async move {
            loop {
                select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        info!(state = %*rx.borrow_and_update(), "farm action");
                    }
                    _ = shutdown_token.cancelled() => break,
                }
            }
        })
    }

    async fn deadline(&self) -> eyre::Result<TransactionDeadline> {
        TransactionDeadline::latest(&self.provider, self.deadline_secs).await
    }

    async fn stake(&self, typed: &str) -> eyre::Result<()> {
        let amount = derive_stake_amount(typed, self.lp_token(), Some(&self.loaded.unstaked_lp))?;

        let mut deadline = self.deadline().await?;
        match self.actions.approval_state(Some(&amount)).await {
            ApprovalState::NotApproved => {
                let outcome = self.actions.approve(Some(&amount), Some(deadline)).await?;
                println!("approved in {}", outcome.hash);
            }
            ApprovalState::Approved => {}
            state => bail!("cannot stake while approval is {state}"),
        }
        if deadline.is_expired(unix_now()?) {
            deadline = self.deadline().await?;
        }

        let outcome = self.actions.stake(Some(&amount), Some(deadline)).await?;
        println!("staked {} LP in {}", format_token_amount(Some(&amount)), outcome.hash);
        Ok(())
    }

    async fn unstake(&self, typed: &str) -> eyre::Result<()> {
        let amount = derive_stake_amount(typed, self.lp_token(), Some(&self.loaded.pool.staked_amount))?;
        let outcome = self.actions.unstake(Some(&amount)).await?;
        println!("withdrew {} LP in {}", format_token_amount(Some(&amount)), outcome.hash);
        Ok(())
    }

    async fn claim(&self) -> eyre::Result<()> {
        let state = self.actions.state();
        let claimable = self
            .loaded
            .pool
            .rewards()
            .streams()
            .any(|stream| claim_enabled(&state, &stream.earned));
        if !claimable {
            bail!("nothing to claim");
        }
        let outcome = self.actions.claim().await?;
        println!(
            "claimed {} in {}",
            earned_usd_label(earned_usd(&self.loaded.pool)),
            outcome.hash
        );
        Ok(())
    }

    fn lp_token(&self) -> &Token {
        self.loaded.pool.lp_token()
    }
}
