use hulc_eval::config::LoggingConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "hulc_eval.log";

fn env_filter(debug: bool, config: &LoggingConfig) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug,reqwest=info,hyper=info,rustyline=info");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},hulc_eval=debug", config.level))
    })
}

/// Console logging always; a daily rolling file in `log_dir` when given and writable.
pub fn init_logging(debug: bool, log_dir: Option<&Path>, config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = env_filter(debug, config);

    // `tracing_appender::rolling::daily` panics if it cannot create the
    // initial file, so preflight writability.
    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                dir.display(),
                e
            );
            return None;
        }

        let test_path = dir.join(".hulc_eval_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the whole process
                Box::leak(Box::new(guard));

                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true);
                if config.json {
                    Some(layer.json().boxed())
                } else {
                    Some(layer.boxed())
                }
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    dir.display(),
                    e
                );
                None
            }
        }
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(debug)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/{}", dir.display(), LOG_FILE_NAME);
    }
}
