mod cli;
mod demo;
mod gateway;
mod infra;
mod routes;
mod server;

use kyc_onboarding::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
