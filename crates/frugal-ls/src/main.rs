//
// main.rs
//
// frugal-ls entry point
//

use std::env;

use frugal_ls::backend;

fn print_usage() {
    println!(
        "frugal-ls {}, a Frugal/Thrift IDL Language Server.",
        env!("CARGO_PKG_VERSION")
    );
    print!(
        r#"
Usage: frugal-ls [OPTIONS]

Available options:

--stdio                      Start the LSP server using stdio transport
--version                    Print the version
--help                       Print this help message

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut use_stdio = false;

    for arg in argv {
        match arg.as_str() {
            "--stdio" => use_stdio = true,
            "--version" => {
                println!("frugal-ls {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    if !use_stdio {
        print_usage();
        return Ok(());
    }

    // stdout carries the LSP channel, env_logger writes to stderr
    env_logger::init();

    backend::start_lsp().await
}
