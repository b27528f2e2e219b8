mod platform;

use std::process::ExitCode;

fn main() -> ExitCode {
    platform::run_cli()
}
