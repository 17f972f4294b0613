use crate::root::Loaded;
use std::path::Path;

pub fn run(config: Option<&Path>, port: u16) -> anyhow::Result<()> {
    let loaded = Loaded::load(config)?;
    let catalog = loaded.catalog()?;
    let engine_config = loaded.config;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "TBM control server on http://localhost:{actual_port}  (tick {} ms, reset {}, fault {})",
            engine_config.tick_interval_ms, engine_config.reset_policy, engine_config.fault_policy
        );

        tokio::select! {
            res = tbm_server::serve_on(engine_config, catalog, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
