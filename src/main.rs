use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match cms_oauth_relay::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cms-oauth-relay: {err}");
            ExitCode::FAILURE
        }
    }
}
