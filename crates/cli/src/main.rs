use std::process::ExitCode;

fn main() -> ExitCode {
    marketdesk_cli::run()
}
