use coupon_api::config::{init_tracing, load_config};
use coupon_api::migrator::run_migration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config()?;
    init_tracing(cfg.log_level(), cfg.log_json);

    if cfg.uses_in_memory_store() {
        anyhow::bail!("database_url is memory://; there is nothing to migrate");
    }

    run_migration(cfg.database_url()).await
}
