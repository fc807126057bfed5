use tracing_subscriber::EnvFilter;

const DEBUG_DIRECTIVES: &str = "duskview_core=debug,duskview_page=debug,wgpu=warn";
const DEFAULT_DIRECTIVES: &str = "duskview_core=info,duskview_page=info,wgpu=error";

/// Install the fmt subscriber. `RUST_LOG` only wins when `debug` is set.
/// Safe to call more than once.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEBUG_DIRECTIVES))
    } else {
        EnvFilter::new(DEFAULT_DIRECTIVES)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
