use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    promptbot_cli::run()
}
