//! Tracing subscriber setup for the binary.
use std::io::IsTerminal as _;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

/// Level used when neither `RUST_LOG` nor `-v` asks for more.
const DEFAULT_LEVEL: &str = "warn";

/// Level selected by `-v`.
const VERBOSE_LEVEL: &str = "debug";

/// Directive applied when `RUST_LOG` is unset or invalid.
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        return VERBOSE_LEVEL;
    }
    return DEFAULT_LEVEL;
}

/// Install the global stderr subscriber once; later calls are ignored.
pub fn init(verbose: bool) {
    static INITIALISED: OnceLock<()> = OnceLock::new();

    let _ = INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(default_directive(verbose)));
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .compact()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
