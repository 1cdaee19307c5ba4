use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};
use httpmate::config::{DispatchConfig, ParseOptions};
use httpmate::execute::{execute_http_files, list_http_files, show_http_request};
use httpmate::http_request_executor::Dispatcher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn files_arg() -> clap::Arg {
    arg!(<FILES> "files")
        .help("http files to read")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .action(ArgAction::Append)
}

fn files(matches: &ArgMatches) -> Vec<&PathBuf> {
    matches
        .get_many::<PathBuf>("FILES")
        .map(Iterator::collect)
        .unwrap_or_default()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "httpmate=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = Command::new("httpmate")
        .author(clap::crate_authors!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(--scheme <SCHEME>)
                .help("Scheme used for requests whose target has none")
                .default_value("http")
                .global(true),
        )
        .subcommand(command!("list").about("list the requests of http files").arg(files_arg()))
        .subcommand(
            command!("show")
                .about("show a single request as it was parsed")
                .arg(
                    arg!(<FILE> "file")
                        .help("http file to read")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    arg!(<REQUEST> "request")
                        .help("number of the request, as printed by list")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            command!("run")
                .about("run one or multiple http files")
                .arg(files_arg())
                .arg(
                    arg!(-r --request <REQUEST>)
                        .help("Only run this request number - you can specify this argument multiple times")
                        .value_parser(value_parser!(u32))
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-p --parallel)
                        .help("Send the selected requests at the same time")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(-t --timeout <SECONDS>)
                        .help("Give up on a request after this many seconds (default: wait forever)")
                        .value_parser(value_parser!(u64)),
                ),
        );

    let matches = cmd.get_matches();
    let mut stdout = std::io::stdout().lock();
    let result = match matches.subcommand() {
        Some(("list", matches)) => list_http_files(&files(matches), &parse_options(matches), &mut stdout),
        Some(("show", matches)) => match (
            matches.get_one::<PathBuf>("FILE"),
            matches.get_one::<u32>("REQUEST"),
        ) {
            (Some(file), Some(request_no)) => show_http_request(
                file,
                *request_no,
                &parse_options(matches),
                DispatchConfig::default().indent,
                &mut stdout,
            ),
            _ => unreachable!("clap enforces required arguments"),
        },
        Some(("run", matches)) => {
            let timeout = matches.get_one::<u64>("timeout").map(|secs| Duration::from_secs(*secs));
            let dispatcher = Dispatcher::from_config(DispatchConfig::default().with_timeout(timeout))?;
            let request_nos: Vec<u32> = matches
                .get_many::<u32>("request")
                .map(|values| values.copied().collect())
                .unwrap_or_default();
            execute_http_files(
                &files(matches),
                &request_nos,
                matches.get_flag("parallel"),
                &parse_options(matches),
                &dispatcher,
                &mut stdout,
            )
        }
        _ => unreachable!("this should've been prevented"),
    };
    return result;
}

fn parse_options(matches: &ArgMatches) -> ParseOptions {
    let scheme = matches.get_one::<String>("scheme").map_or("http", String::as_str);
    ParseOptions::default().with_default_scheme(scheme)
}
