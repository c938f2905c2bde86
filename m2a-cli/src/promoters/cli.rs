use clap::{Arg, Command, arg, value_parser};

use crate::config::config_arg;

pub const PROMOTERS_CMD: &str = "promoters";

pub fn create_promoters_cli() -> Command {
    Command::new(PROMOTERS_CMD)
        .about("Derive promoter definitions from the transcripts of a GFF3 gene annotation.")
        .arg(
            arg!(--gff <GFF>)
                .required(true)
                .help("Path to GFF3 / GFF3.gz annotation"),
        )
        .arg(
            arg!(--output <OUTPUT>)
                .required(true)
                .help("Output promoter definition TSV"),
        )
        .arg(
            Arg::new("chromosomes")
                .long("chromosomes")
                .required(false)
                .value_delimiter(',')
                .help("Comma separated chromosomes to keep (default: chr1..chr22)"),
        )
        .arg(
            Arg::new("min-tss-spacing")
                .long("min-tss-spacing")
                .required(false)
                .value_parser(value_parser!(i64))
                .help("Minimum distance in bp between kept TSSs on the same strand (default: 1000)"),
        )
        .arg(
            Arg::new("response-window")
                .long("response-window")
                .required(false)
                .value_parser(value_parser!(i64))
                .help("Width in bp of the response window centred on the TSS (default: 2000)"),
        )
        .arg(config_arg())
}
