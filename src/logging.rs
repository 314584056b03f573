//! A thin `tracing-subscriber` bootstrap for binaries and tests that
//! embed this crate and want a sane default subscriber. The engine
//! itself never installs a global subscriber — that decision belongs
//! to the embedding application — it only emits `tracing` events at
//! the call sites throughout `registry`, `emitter`, and `hooks`.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber driven by `RUST_LOG` (defaulting to
/// `info`). Safe to call more than once; subsequent calls are no-ops.
pub fn init_default() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
