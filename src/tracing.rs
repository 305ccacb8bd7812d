//! Tracing (logging)

use crate::cli::CommandLineArgs;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initlialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to enable debug
/// logging for this crate and tower_http if not set. Spans are also exported to Jaeger when
/// enabled on the command line.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn init_tracing(args: &CommandLineArgs) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tweetstats=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());
    if args.enable_jaeger {
        opentelemetry::global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());
        match opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name("tweetstats")
            .install_simple()
        {
            Ok(tracer) => {
                registry
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .init();
                return;
            }
            Err(error) => eprintln!("Failed to initialise Jaeger tracing: {}", error),
        }
    }
    registry.init();
}

/// Flush and shut down tracing.
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
