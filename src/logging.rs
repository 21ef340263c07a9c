use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the platform logger once per process.
///
/// Android routes `log` records to logcat; everywhere else `env_logger` writes to
/// stderr and honors `RUST_LOG` (default level `info`).
pub fn init_logging() {
    INIT.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("stickerpack"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .try_init();
        }

        log::debug!("Logging initialized");
    });
}
