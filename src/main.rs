use std::path::PathBuf;
use std::process::ExitCode;

use clap::{arg, value_parser, Command};
use libsecrets::format::{render, Format};
use libsecrets::{read_secrets_file, resolve_secrets_path};
use tracing::{debug, error, Level};

fn main() -> ExitCode {
    let matches = Command::new("read-exported-secrets")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reads a secrets file written by `murmur export` and prints it")
        .arg(
            arg!(--file <PATH> "Secrets file (defaults to $MURMUR_EXPORT_FILE or /tmp/secrets.env)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--format <FORMAT> "Output format: json, dotenv or properties")
                .value_parser(|name: &str| name.parse::<Format>())
                .default_value("json"),
        )
        .arg(arg!(-v --verbose "Log debug output to stderr"))
        .get_matches();

    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let path = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .unwrap_or_else(resolve_secrets_path);
    let format = matches
        .get_one::<Format>("format")
        .copied()
        .unwrap_or_default();

    let secrets = match read_secrets_file(&path) {
        Ok(secrets) => secrets,
        Err(err) => {
            error!("failed to read secrets from {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let output = match render(&secrets, format) {
        Ok(output) => output,
        Err(err) => {
            error!("failed to render {} secrets as {:?}: {}", secrets.len(), format, err);
            return ExitCode::FAILURE;
        }
    };

    debug!("rendered {} secrets as {:?}", secrets.len(), format);
    print!("{}", output);
    if !output.is_empty() && !output.ends_with('\n') {
        println!();
    }
    ExitCode::SUCCESS
}
