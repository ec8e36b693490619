#[tokio::main]
async fn main() -> std::io::Result<()> {
    position_sync::frameworks::server::run_with_config().await
}
