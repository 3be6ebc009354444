//! termrun - Run templated Telnet/SSH scripts against many hosts
//!
//! Entry point for the Rust CLI binary.

use console::style;

fn main() {
    if let Err(e) = termrun::run() {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
