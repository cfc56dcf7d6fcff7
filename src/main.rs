#[tokio::main]
async fn main() -> anyhow::Result<()> {
    unidownload::run().await
}
