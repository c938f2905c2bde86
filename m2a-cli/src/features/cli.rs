use clap::{Command, arg};

use crate::config::{config_arg, threads_arg, window_args};

pub const FEATURES_CMD: &str = "features";

pub fn create_features_cli() -> Command {
    Command::new(FEATURES_CMD)
        .about("Compute windowed methylation statistics around every promoter TSS.")
        .arg(
            arg!(--promoters <PROMOTERS>)
                .required(true)
                .help("Promoter definition TSV"),
        )
        .arg(
            arg!(--methylation <METHYLATION>)
                .required(true)
                .help("Methylation TSV (or .gz) with chrom, pos and mval columns"),
        )
        .arg(
            arg!(--output <OUTPUT>)
                .required(true)
                .help("Output window feature TSV"),
        )
        .args(window_args())
        .arg(threads_arg())
        .arg(config_arg())
}
