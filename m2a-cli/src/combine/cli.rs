use clap::{Arg, Command, arg, value_parser};

use crate::config::{config_arg, window_args};

pub const COMBINE_CMD: &str = "combine";

pub fn create_combine_cli() -> Command {
    Command::new(COMBINE_CMD)
        .about("Normalise window features and assemble them into a model-ready tensor archive.")
        .arg(
            arg!(--features <FEATURES>)
                .required(true)
                .help("Window feature TSV written by `features`"),
        )
        .arg(
            arg!(--response <RESPONSE>)
                .required(false)
                .help("Response TSV written by `response`; attached to the tensor when given"),
        )
        .arg(
            arg!(--output <OUTPUT>)
                .required(true)
                .help("Output .npz archive; the axis manifest is written next to it"),
        )
        .arg(
            Arg::new("scale-range")
                .long("scale-range")
                .required(false)
                .num_args(2)
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .help("Target range of the min-max scaling, as LOW HIGH (default: 0.1 1.0)"),
        )
        .arg(
            Arg::new("missing-fill")
                .long("missing-fill")
                .required(false)
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .help("Value written for windows without methylation data (default: 0.0)"),
        )
        .args(window_args())
        .arg(config_arg())
}
