#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = falowen::run().await {
        eprintln!("falowen fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
