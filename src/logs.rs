use crate::types::LogFormat;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;

pub fn init_logs(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt::Subscriber::builder()
        .with_timer(UtcTime::rfc_3339())
        // see https://docs.rs/env_logger/latest/env_logger/#enabling-logging for details on how to use the RUST_LOG env var to control logging levels
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())
        }
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
    };

    result.expect("setting default subscriber failed");
}
