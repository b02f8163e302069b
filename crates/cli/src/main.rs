use std::process::ExitCode;

fn main() -> ExitCode {
    riskline_cli::run()
}
