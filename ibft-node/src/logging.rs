use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

/// Target of the audit trail written to `logs/audit-<label>.log`.
pub const CONSENSUS_TARGET: &str = "consensus";

/// Installs the stdout and audit-file layers. Keep the guard alive for the
/// lifetime of the process or buffered audit lines are lost.
pub fn init(label: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never("logs", format!("audit-{}.log", label));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let consensus_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() == CONSENSUS_TARGET
        }));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ibft_node=debug".into()),
        )
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target() != CONSENSUS_TARGET
        }));

    tracing_subscriber::registry()
        .with(consensus_layer)
        .with(stdout_layer)
        .init();

    guard
}

/// Writes crash information to stderr and to `logs/panic-<label>.log`.
pub fn install_panic_hook(label: &str) {
    let path = format!("logs/panic-{}.log", label);
    std::panic::set_hook(Box::new(move |info| {
        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<Any>",
            },
        };
        let location = match info.location() {
            Some(l) => format!("at {}:{}:{}", l.file(), l.line(), l.column()),
            None => "unknown location".to_string(),
        };
        let err_msg = format!("CRASH: {} {}\n", msg, location);
        eprintln!("{}", err_msg);
        let _ = std::fs::create_dir_all("logs");
        let _ = std::fs::write(&path, err_msg);
    }));
}
