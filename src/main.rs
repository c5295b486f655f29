use std::process::ExitCode;

use mwpf::{
    AppError, FieldConfig, FileRegistry, LaunchMode, LaunchOptions, Registry, Simulation,
};

fn run(options: LaunchOptions) -> Result<(), AppError> {
    let mut config = match &options.config {
        Some(path) => FieldConfig::load(path)?,
        None => FieldConfig::default(),
    };
    if let Some(path) = options.registry {
        config.registry.path = path;
    }
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }

    if options.mode == LaunchMode::Clear {
        let mut registry = FileRegistry::new(&config.registry);
        registry.clear()?;
        return Ok(());
    }

    let simulation = Simulation::new().with_config(config);
    match options.headless {
        Some(frames) => simulation.run_headless(frames).map(|_| ()),
        None => simulation.run(),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let options = match LaunchOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}\n\n{}", e, mwpf::startup::USAGE);
            return ExitCode::from(2);
        }
    };

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
