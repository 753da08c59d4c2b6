use std::error::Error;

use socks_forward::{CancellationToken, DirectForwarder, Socks5Server, SocksConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(listen_addr) => SocksConfig::new(listen_addr),
        None => SocksConfig::default(),
    };
    let server = Socks5Server::new(config, DirectForwarder::default());

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    server.listen_and_serve(&token).await?;
    Ok(())
}
