use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    clindiag_lib::run().await
}
