//! Logging initialisation.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter directives.
pub const LOG_FILTER_ENV: &str = "FOREMAN_LOG";

const DEFAULT_FILTER: &str = "info";

static INIT: Once = Once::new();

/// Installs the global subscriber writing to stderr.
///
/// Filter directives come from `FOREMAN_LOG` (for example
/// `foreman=debug`) and default to `info`. Calls after the first are
/// no-ops.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();
        if installed.is_err() {
            tracing::debug!("a global subscriber was already installed");
        }
    });
}
