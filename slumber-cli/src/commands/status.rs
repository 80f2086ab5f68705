//! `slumber status`: query a running bridge over its RPC endpoint.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use tabled::{settings::Style, Table, Tabled};

use slumber_core::{Config, RegistrationRecord, SyncState};
use slumber_sidecar::RpcClient;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Main-process RPC port; defaults to `rpc.core_port` from the config.
    #[arg(long)]
    pub core_port: Option<u16>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    state: SyncState,
    stats: Counters,
    osc: OscEndpoints,
    #[serde(default)]
    devices_powered_off: u64,
    started_at: DateTime<Utc>,
    #[serde(default)]
    sidecars: Vec<RegistrationRecord>,
}

#[derive(Debug, Deserialize)]
struct Counters {
    broadcasts: u64,
    resyncs: u64,
    unmatched_addresses: u64,
    unknown_commands: u64,
    type_mismatches: u64,
}

#[derive(Debug, Deserialize)]
struct OscEndpoints {
    listen: SocketAddr,
    target: SocketAddr,
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "parameter")]
    parameter: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

#[derive(Tabled)]
struct SidecarRow {
    #[tabled(rename = "pid")]
    pid: u32,
    #[tabled(rename = "endpoint")]
    endpoint: String,
    #[tabled(rename = "registered")]
    registered: String,
}

impl StatusArgs {
    pub fn run(self, config: Config) -> Result<()> {
        let port = self.core_port.unwrap_or(config.rpc.core_port);
        if port == 0 {
            bail!("the main-process RPC port is not fixed in the config; pass --core-port");
        }
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

        let raw = crate::runtime()?.block_on(async {
            let mut client = RpcClient::connect(addr)
                .await
                .with_context(|| format!("slumber is not reachable on {addr}"))?;
            client.status().await.context("status request failed")
        })?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&raw).context("failed to render status JSON")?
            );
            return Ok(());
        }

        let payload: StatusPayload =
            serde_json::from_value(raw).context("unexpected status payload")?;
        print_status(&payload);
        Ok(())
    }
}

fn print_status(payload: &StatusPayload) {
    let uptime = Utc::now().signed_duration_since(payload.started_at);
    println!(
        "Slumber v{} | OSC {} -> {} | up {}",
        env!("CARGO_PKG_VERSION"),
        payload.osc.listen,
        payload.osc.target,
        format_uptime(uptime.num_seconds()),
    );

    let rows = vec![
        ParameterRow {
            parameter: "SleepMode",
            value: on_off(payload.state.sleep_mode),
        },
        ParameterRow {
            parameter: "SleepingAnimations",
            value: on_off(payload.state.sleeping_animations),
        },
        ParameterRow {
            parameter: "StatusAutomations",
            value: on_off(payload.state.status_automations),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let stats = &payload.stats;
    println!(
        "broadcasts {} | resyncs {} | devices powered off {}",
        stats.broadcasts, stats.resyncs, payload.devices_powered_off,
    );
    let ignored = stats.unmatched_addresses + stats.unknown_commands + stats.type_mismatches;
    if ignored > 0 {
        println!(
            "{}",
            format!(
                "ignored: {} unmatched, {} unknown commands, {} wrong types",
                stats.unmatched_addresses, stats.unknown_commands, stats.type_mismatches,
            )
            .yellow()
        );
    }

    if payload.sidecars.is_empty() {
        println!("No overlay sidecar registered.");
        return;
    }
    let rows: Vec<SidecarRow> = payload
        .sidecars
        .iter()
        .map(|record| SidecarRow {
            pid: record.pid,
            endpoint: record.endpoint.to_string(),
            registered: record.registered_at.to_rfc3339(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn on_off(value: bool) -> String {
    if value {
        "on".green().to_string()
    } else {
        "off".bright_black().to_string()
    }
}

fn format_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    match seconds {
        0..=59 => format!("{seconds}s"),
        60..=3599 => format!("{}m{}s", seconds / 60, seconds % 60),
        _ => format!("{}h{}m", seconds / 3600, (seconds % 3600) / 60),
    }
}
