use std::process;

#[tokio::main]
async fn main() {
    process::exit(a10ctl_cli::run().await);
}
