use std::process::ExitCode;

fn main() -> ExitCode {
    tireslingers_cli::run()
}
