#[tokio::main]
async fn main() -> anyhow::Result<()> {
    healthy_air_lib::run().await
}
