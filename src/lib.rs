pub mod api;
pub mod core;
pub mod frame_filter;

pub fn init_logging() {
    // try_init: a second call (tests, embedding apps) keeps the first logger
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
