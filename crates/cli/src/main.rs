use std::process::ExitCode;

fn main() -> ExitCode {
    glowie_cli::run()
}
