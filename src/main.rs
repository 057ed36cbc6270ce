mod cli;

use clap::Parser;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Trace);
    clog.init();
    log::set_max_level(log::LevelFilter::Info);

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let cli = cli::Cli::parse();
    let config = cli::load_config(&cli)?;
    log::set_max_level(config.logging.level.level_filter());

    cli::run(cli, config)?;
    Ok(())
}
