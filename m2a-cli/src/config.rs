use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, arg, value_parser};

use m2a_features::PipelineConfig;

///
/// Arguments that override [PipelineConfig] fields. Subcommands pick the ones they use.
///
pub fn config_arg() -> Arg {
    arg!(--config <CONFIG>)
        .required(false)
        .help("TOML file with pipeline settings; flags given on the command line take precedence")
}

pub fn threads_arg() -> Arg {
    arg!(--threads <THREADS>)
        .required(false)
        .value_parser(value_parser!(usize))
        .help("Number of worker threads")
}

pub fn window_args() -> [Arg; 2] {
    [
        Arg::new("window-sizes")
            .long("window-sizes")
            .required(false)
            .value_delimiter(',')
            .value_parser(value_parser!(u32))
            .help("Comma separated window sizes in bp, one per resolution (default: 250,2500)"),
        Arg::new("num-windows")
            .long("num-windows")
            .required(false)
            .value_parser(value_parser!(usize))
            .help("Windows per promoter and resolution, half upstream and half downstream (default: 20)"),
    ]
}

///
/// Build the pipeline configuration: defaults, then `--config`, then individual flags.
///
pub fn load_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => PipelineConfig::try_from(Path::new(path))
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => PipelineConfig::default(),
    };

    if let Ok(Some(sizes)) = matches.try_get_many::<u32>("window-sizes") {
        config.window_sizes = sizes.copied().collect();
    }
    if let Ok(Some(num_windows)) = matches.try_get_one::<usize>("num-windows") {
        config.num_windows = *num_windows;
    }
    if let Ok(Some(threads)) = matches.try_get_one::<usize>("threads") {
        config.threads = *threads;
    }

    config.validate().context("Invalid pipeline configuration")?;
    log::debug!("{:?}", config);
    Ok(config)
}
