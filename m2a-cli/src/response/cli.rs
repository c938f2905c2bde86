use clap::{Command, arg};

pub const RESPONSE_CMD: &str = "response";

pub fn create_response_cli() -> Command {
    Command::new(RESPONSE_CMD)
        .about("Compute log2 ChIP over Input enrichment in every promoter's response window.")
        .arg(
            arg!(--promoters <PROMOTERS>)
                .required(true)
                .help("Promoter definition TSV"),
        )
        .arg(arg!(--chip <CHIP>).required(true).help("ChIP bigWig"))
        .arg(arg!(--input <INPUT>).required(true).help("Input (control) bigWig"))
        .arg(
            arg!(--output <OUTPUT>)
                .required(true)
                .help("Output response TSV"),
        )
}
