use log::LevelFilter;

/// Install the stderr logger. `RUST_LOG` sets the base filter; the CLI flags
/// override it.
pub fn init(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    if !verbose {
        builder.filter_module("reqwest", LevelFilter::Warn);
        builder.filter_module("html5ever", LevelFilter::Off);
        builder.filter_module("selectors", LevelFilter::Off);
    }
    builder
        .format_timestamp(None)
        .target(env_logger::Target::Stderr);
    let _ = builder.try_init();
}
