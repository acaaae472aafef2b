/// Install the process-wide tracing subscriber. Called once, from
/// `wisun-router::main` — library crates only ever emit events, never
/// install a subscriber (mirrors the teacher's daemon entrypoint pattern).
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wisun_router=debug".parse().unwrap()),
        )
        .init();
}
