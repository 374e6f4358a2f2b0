//! Log output of the `quickdex` binary. Logs go to stderr so command output on stdout
//! stays machine-readable.
use std::sync::OnceLock;

use color_eyre::eyre::{self, Context as _, bail};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// HTTP and RPC transport crates, capped at `warn` so subgraph and RPC traffic don't
/// drown out command logs.
const TRANSPORT_TARGETS: [&str; 4] = ["h2", "hyper_util", "reqwest", "alloy_transport_http"];

/// Level used when `RUST_LOG` is unset: warnings only, one step louder per `-v`.
pub fn default_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` directives on top of [`default_level`], with the transport crates capped.
pub fn env_filter(verbosity: u8) -> EnvFilter {
    let base = EnvFilter::builder()
        .with_default_directive(default_level(verbosity).into())
        .from_env_lossy();
    TRANSPORT_TARGETS
        .iter()
        .filter_map(|target| format!("{target}=warn").parse().ok())
        .fold(base, EnvFilter::add_directive)
}

pub fn get_subscriber(verbosity: u8) -> impl Subscriber + Send + Sync {
    let debugging = verbosity >= 2;
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debugging)
        .with_line_number(debugging);

    tracing_subscriber::Registry::default()
        .with(env_filter(verbosity))
        .with(fmt_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> eyre::Result<()> {
    if TELEMETRY_INIT.set(()).is_err() {
        bail!("global tracing subscriber already set");
    }
    tracing::subscriber::set_global_default(subscriber).wrap_err("setting default subscriber failed")
}
