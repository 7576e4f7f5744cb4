use std::path::PathBuf;

use clap::{App, Arg};
use colored::*;

use cprep::preprocess::preprocess_file;

fn main() {
    let matches = App::new("cprep")
        .version("0.1.0")
        .about("A standalone C-like macro preprocessor")
        .arg(
            Arg::with_name("include")
                .short("I")
                .help("Directory to search for included files (repeatable)")
                .multiple(true)
                .number_of_values(1)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("input")
                .help("Source file to preprocess")
                .required(true),
        )
        .get_matches();

    let include_dirs: Vec<PathBuf> = matches
        .values_of("include")
        .map(|vs| vs.map(PathBuf::from).collect())
        .unwrap_or_default();

    let input = PathBuf::from(matches.value_of("input").unwrap());

    match preprocess_file(&input, &include_dirs) {
        Ok(output) => {
            print!("{}", output);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
