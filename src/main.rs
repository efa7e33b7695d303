#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = iview_bff::run().await {
        eprintln!("iview-bff fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
