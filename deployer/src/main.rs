use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match jobboard_deployer::run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(err.exit_code())
        },
    }
}
