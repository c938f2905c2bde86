mod combine;
mod config;
mod features;
mod promoters;
mod response;

use anyhow::Result;
use clap::{ArgAction, Command, arg};
use env_logger::Env;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "m2a";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Methylation window features and multi-resolution tensors for promoter activity models.")
        .subcommand_required(true)
        .arg(
            arg!(-v --verbose)
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Log debug messages (RUST_LOG takes precedence)"),
        )
        .subcommand(promoters::cli::create_promoters_cli())
        .subcommand(features::cli::create_features_cli())
        .subcommand(response::cli::create_response_cli())
        .subcommand(combine::cli::create_combine_cli())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        //
        // PROMOTER DEFINITIONS
        //
        Some((promoters::cli::PROMOTERS_CMD, matches)) => {
            promoters::handlers::run_promoters(matches)?;
        }

        //
        // WINDOW FEATURES
        //
        Some((features::cli::FEATURES_CMD, matches)) => {
            features::handlers::run_features(matches)?;
        }

        //
        // RESPONSE VARIABLE
        //
        Some((response::cli::RESPONSE_CMD, matches)) => {
            response::handlers::run_response(matches)?;
        }

        //
        // TENSOR ASSEMBLY
        //
        Some((combine::cli::COMBINE_CMD, matches)) => {
            combine::handlers::run_combine(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }

    #[rstest]
    fn test_parses_combine_overrides() {
        let matches = build_parser()
            .try_get_matches_from([
                "m2a",
                "-v",
                "combine",
                "--features",
                "f.tsv",
                "--output",
                "out.npz",
                "--window-sizes",
                "100,1000",
                "--scale-range",
                "-1",
                "1",
            ])
            .unwrap();
        assert!(matches.get_flag("verbose"));

        let (_, sub) = matches.subcommand().unwrap();
        let config = config::load_config(sub).unwrap();
        assert_eq!(config.window_sizes, vec![100, 1000]);
        assert_eq!(config.num_windows, 20);
        let range: Vec<f64> = sub.get_many::<f64>("scale-range").unwrap().copied().collect();
        assert_eq!(range, vec![-1.0, 1.0]);
    }
}
