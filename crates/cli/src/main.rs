use std::process::ExitCode;

fn main() -> ExitCode {
    techstore_cli::run()
}
