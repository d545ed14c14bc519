use anyhow::Context;
use clap::Args;
use ragbot_core::config::AppConfig;
use ragbot_server::AppState;

/// Run the HTTP API and chat page
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, mut config: AppConfig) -> anyhow::Result<()> {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        let state = AppState::from_config(&config).context("Failed to build pipeline")?;
        ragbot_server::serve(&config, state).await?;
        Ok(())
    }
}
