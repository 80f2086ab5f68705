//! `slumber notify`: post a notification straight to an overlay sidecar.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use clap::Args;

use slumber_sidecar::RpcClient;

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// RPC port the sidecar registered with.
    #[arg(long)]
    pub sidecar_port: u16,

    /// How long the notification stays up.
    #[arg(long, default_value_t = 5000)]
    pub duration_ms: u32,

    /// Notification text.
    pub message: String,
}

impl NotifyArgs {
    pub fn run(self) -> Result<()> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.sidecar_port));
        let id = crate::runtime()?.block_on(async {
            let mut client = RpcClient::connect(addr)
                .await
                .with_context(|| format!("overlay sidecar is not reachable on {addr}"))?;
            client
                .add_notification(self.message, self.duration_ms)
                .await
                .context("add_notification failed")
        })?;

        match id {
            Some(id) => println!("{id}"),
            None => println!("notification declined by the overlay"),
        }
        Ok(())
    }
}
