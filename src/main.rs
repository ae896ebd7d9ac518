use std::io;
use std::process;

use rsa_textbook::ui::run_console;
use rsa_textbook::util::KeyFileConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging on stderr, prompts stay on stdout
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rsa_textbook=info")),
        )
        .init();

    if let Err(e) = run_console(KeyFileConfig::from_env()) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
