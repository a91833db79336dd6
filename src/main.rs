use std::process;

use clap::Parser;

use regexcop::cli::Args;

fn main() {
    let args = Args::parse();
    regexcop::init_logging(args.debug);
    match regexcop::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(3);
        }
    }
}
