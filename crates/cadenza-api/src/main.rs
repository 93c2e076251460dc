use cadenza_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = cadenza_api::setup::initialize_app(config.clone()).await?;

    cadenza_api::setup::server::start_server(&config, state, router).await?;

    Ok(())
}
