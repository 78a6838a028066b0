//! noteshare: study notes by branch, year and semester
//!
//! Usage:
//!   noteshare serve               Start the HTTP API
//!   noteshare serve --port 9000   Start the HTTP API on a given port
//!   noteshare status [path]       Show catalog statistics
//!   noteshare search <query>      Search subjects and notes
//!   noteshare trending [n]        List the most downloaded notes

mod server;

use std::env;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use noteshare::aggregate::DEFAULT_TRENDING_LIMIT;
use noteshare::cli::{search_command, status_command, trending_command};
use noteshare::config::Config;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    setup_logging();

    match args[1].as_str() {
        "serve" => {
            let mut config = Config::from_env()?;
            if let Some(port) = args
                .iter()
                .position(|a| a == "--port")
                .and_then(|i| args.get(i + 1))
            {
                config.port = port
                    .parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("Invalid --port '{}': {}", port, e))?;
            }
            server::start_http(config)?;
        }
        "status" => {
            let path = args.get(2).map(|s| s.as_str()).unwrap_or(".");
            status_command(path)?;
        }
        "search" => {
            if args.len() < 3 {
                eprintln!("Usage: noteshare search <query>");
                return Ok(());
            }
            let query = args[2..].join(" ");
            search_command(".", &query)?;
        }
        "trending" => {
            let limit = match args.get(2) {
                Some(n) => n
                    .parse::<usize>()
                    .map_err(|e| anyhow::anyhow!("Invalid count '{}': {}", n, e))?,
                None => DEFAULT_TRENDING_LIMIT,
            };
            trending_command(".", limit)?;
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "--version" | "-V" | "version" => {
            print_version();
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"noteshare: study notes by branch, year and semester

USAGE:
    noteshare <COMMAND> [OPTIONS]

COMMANDS:
    serve                  Start the HTTP API (port from NOTESHARE_PORT, default 8080)
    serve --port <PORT>    Start the HTTP API on a given port
    status [path]          Show catalog statistics for a data root
    search <query>         Search subjects and published notes
    trending [n]           List the n most downloaded notes (default 5)
    help                   Show this help message

ENVIRONMENT:
    NOTESHARE_ROOT             Directory holding .noteshare/notes.db
    NOTESHARE_IN_MEMORY=1      Keep the catalog in memory only
    NOTESHARE_ADMIN_TOKEN      Bearer token for admin routes
    NOTESHARE_ADMIN_EMAILS     Comma separated admin allow-list
    NOTESHARE_MAX_UPLOAD_MB    Upload size limit (default 50)
    NOTESHARE_HIT_WINDOW_SECS  Repeat view/download window (default 1800)
    CLOUDINARY_CLOUD_NAME      Cloudinary cloud for PDF uploads
    CLOUDINARY_UPLOAD_PRESET   Unsigned upload preset
    CLOUDINARY_FOLDER          Upload folder (default notes)

EXAMPLES:
    noteshare serve --port 3000      # Serve the API on port 3000
    noteshare search "data"          # Find notes mentioning "data"
    noteshare trending 10            # Top 10 notes by downloads
"#
    );
}

fn print_version() {
    println!("noteshare {}", env!("CARGO_PKG_VERSION"));
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
