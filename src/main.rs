use clap::Parser;
use portmapper::config::Config;
use portmapper::{Router, UpnpRouter};
use std::io::Write;
use std::path::PathBuf;

/// Print status and flush stdout
macro_rules! status {
    ($($arg:tt)*) => {{
        print!($($arg)*);
        let _ = std::io::stdout().flush();
    }};
}

#[derive(Parser, Debug)]
#[command(name = "portmapper")]
#[command(about = "Find the local address a UPnP gateway should forward to")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Router display name (overrides the configuration file)
    #[arg(short, long)]
    name: Option<String>,

    /// Do not search for a gateway, resolve the address without one
    #[arg(long)]
    no_discover: bool,
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(name) = args.name {
        config.router.name = name;
    }
    if args.no_discover {
        config.router.discover = false;
    }

    if let Some(path) = portmapper::log::init(&config.logging) {
        println!("Logging to {}", path.display());
    }

    let router = match UpnpRouter::new(config.router.name.clone()) {
        Ok(router) => router,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if config.router.discover {
        status!("Searching for UPnP gateway... ");
        match router.connect(&config.router.search()) {
            Ok(()) => println!("OK"),
            Err(e) => {
                println!("FAILED");
                eprintln!("  {}", e);
            }
        }
    }

    let code = report(&router);
    router.close();
    std::process::exit(code);
}

/// Print what is known about the router, returning the exit code.
fn report(router: &UpnpRouter) -> i32 {
    println!();
    println!("Router: {}", router);

    let code = match router.local_host_address() {
        Ok(address) => {
            println!("  Local address: {}", address);
            0
        }
        Err(e) => {
            eprintln!("  Could not determine local address: {}", e);
            1
        }
    };

    if router.is_connected() {
        match router.external_ip() {
            Ok(ip) => println!("  External address: {}", ip),
            Err(e) => eprintln!("  {}", e),
        }
    }
    code
}
