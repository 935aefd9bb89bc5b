use clap::{Arg, ArgAction, Command};
use owo_colors::OwoColorize;
use std::path::Path;
use tracing::{debug, warn};
use tracing_subscriber::{self, EnvFilter};

use markercheck::checking::{check_book, UsfmVersion};
use markercheck::parsing;
use markercheck::stylesheet::{parse_stylesheet, MarkerCatalog, Stylesheet};

mod problem;

fn main() {
    const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

    // Initialize the tracing subscriber. This respects the RUST_LOG
    // environment variable if present, or sets Level::ERROR as a fallback.
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let command = Command::new("markercheck")
        .version(VERSION)
        .about("Validate the structure of a USFM Scripture book.")
        .disable_help_subcommand(true)
        .arg(
            Arg::new("usfm2")
                .long("usfm2")
                .action(ArgAction::SetTrue)
                .help("Check against USFM 2.0; markers and attributes introduced by USFM 3.0 become errors."),
        )
        .arg(
            Arg::new("book-code")
                .required(true)
                .help("The code of the book being checked, e.g. GEN or 1CO."),
        )
        .arg(
            Arg::new("filename")
                .required(true)
                .help("The file containing the USFM text of the book."),
        );

    let matches = match command.try_get_matches() {
        Ok(matches) => matches,
        Err(error) => {
            // Bad arguments put the usage text on stdout and fail
            println!("{}", error.render());
            std::process::exit(1);
        }
    };

    let usfm2 = matches
        .get_one::<bool>("usfm2")
        .unwrap(); // flags are always present since SetTrue implies default_value

    let version = if *usfm2 {
        UsfmVersion::Two
    } else {
        UsfmVersion::Three
    };

    debug!(?version);

    let book = matches
        .get_one::<String>("book-code")
        .unwrap(); // arguments are required by definition so always present

    debug!(book);

    let filename = matches
        .get_one::<String>("filename")
        .unwrap();

    debug!(filename);

    // The stylesheet comes from the working directory. A missing or
    // unreadable stylesheet is logged and the check proceeds with an
    // empty catalog rather than aborting.
    let sheet = Path::new("usfm.sty");
    let mut stylesheet = match parsing::load(sheet) {
        Ok(content) => parse_stylesheet(&content),
        Err(error) => {
            warn!(%error, "stylesheet not loaded");
            Stylesheet {
                catalog: MarkerCatalog::new(),
                errors: vec![],
            }
        }
    };

    for error in &stylesheet.errors {
        eprintln!("{}", problem::stylesheet_error(sheet, error));
    }

    let filename = Path::new(filename);
    let content = match parsing::load(filename) {
        Ok(data) => data,
        Err(error) => {
            eprintln!("{}", problem::concise_loading_error(&error));
            std::process::exit(1);
        }
    };

    let diagnostics = check_book(&mut stylesheet.catalog, book, version, &content);

    for diagnostic in &diagnostics {
        println!("{}", problem::diagnostic_line(diagnostic));
    }

    if !diagnostics.is_empty() {
        std::process::exit(1);
    }

    eprintln!("{}", "ok".bright_green());
}
