#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asknova_server::start().await
}
