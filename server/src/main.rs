//! Dedicated server entry point

use clap::Parser;
use log::{error, info};

/// Command-line arguments for the dedicated server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// UDP port to listen on
    #[arg(short, long, default_value_t = shared::constants::PORT)]
    port: u16,
}

fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.host, args.port);

    info!("Starting dedicated server on {bind_addr}");

    let mut router = match server::Router::start(bind_addr) {
        Ok(router) => router,
        Err(e) => {
            error!("{e}");
            std::process::exit(-1);
        }
    };

    if let Err(e) = router.run() {
        error!("{e}");
        std::process::exit(-1);
    }
}
