#[tokio::main]
async fn main() -> anyhow::Result<()> {
    smash_stats::run().await
}
