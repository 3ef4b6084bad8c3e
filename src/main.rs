//! Cocina CLI — declarative code generation.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "cocina",
    version,
    about = "Declarative code generation — kits, cookbooks, YAML recipes, two-pass model resolution"
)]
struct Cli {
    #[command(subcommand)]
    command: cocina::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    match cocina::cli::dispatch(cli.command) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
