use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(error) = backend::run().await {
        error!("Backend exited with error: {:#}", error);
        // Tracing may not be initialized yet when config loading fails.
        eprintln!("Backend exited with error: {error:#}");
        std::process::exit(1);
    }
}
