//! CLI command implementations

use crate::output::emit;
use crate::simulator::{self, SimulationPlan};
use anyhow::Context;
use kino_vpaid_core::{AdParameters, AdSession, AdSessionConfig};
use serde::Serialize;

/// Read a blob given inline or as `@path`
fn read_blob(blob: &str) -> anyhow::Result<String> {
    match blob.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read parameters from {}", path)),
        None => Ok(blob.to_string()),
    }
}

#[derive(Serialize)]
struct HandshakeReport<'a> {
    host_version: &'a str,
    ad_version: String,
}

/// Answer a host handshake
pub fn handshake(config: AdSessionConfig, host_version: &str, format: &str) -> anyhow::Result<()> {
    let session = AdSession::new(config)?;
    let report = HandshakeReport {
        host_version,
        ad_version: session.handshake_version(host_version),
    };

    emit(&report, format, |r| {
        println!("Host offered: {}", r.host_version);
        println!("Ad supports:  {}", r.ad_version);
    });
    Ok(())
}

#[derive(Serialize)]
struct ParamsReport {
    parameters: AdParameters,
    assets: Vec<(String, String)>,
}

/// Decode a parameter blob and resolve asset paths against it
pub fn params(blob: &str, assets: &[String], format: &str) -> anyhow::Result<()> {
    let raw = read_blob(blob)?;
    let parameters = AdParameters::parse(&raw)?;

    let mut resolved = Vec::with_capacity(assets.len());
    for path in assets {
        let url = parameters.asset_url(path)?;
        resolved.push((path.clone(), url.to_string()));
    }

    let report = ParamsReport {
        parameters,
        assets: resolved,
    };

    emit(&report, format, |r| {
        println!("Creative Parameters:");
        println!("  Video: {}", r.parameters.video_url);
        match &r.parameters.base_url_images {
            Some(base) => println!("  Images: {}", base),
            None => println!("  Images: (none)"),
        }

        let fonts: Vec<_> = r.parameters.font_faces().collect();
        if !fonts.is_empty() {
            println!("\nFonts:");
            for (family, url) in fonts {
                println!("  {} - {}", family, url);
            }
        }

        if !r.parameters.extra.is_empty() {
            println!("\nOther fields:");
            for key in r.parameters.extra.keys() {
                println!("  {}", key);
            }
        }

        if !r.assets.is_empty() {
            println!("\nAssets:");
            for (path, url) in &r.assets {
                println!("  {} -> {}", path, url);
            }
        }

        println!("\nParameters: OK");
    });
    Ok(())
}

/// Run a simulated ad session and print its event log
pub async fn simulate(
    config: AdSessionConfig,
    params: &str,
    plan: SimulationPlan,
    format: &str,
) -> anyhow::Result<()> {
    let raw = read_blob(params)?;
    let report = simulator::run(config, &raw, &plan).await?;

    emit(&report, format, |r| {
        println!("Session {}", r.session_id);
        println!("  Source: {}", r.source.as_deref().unwrap_or("(none)"));
        println!("  Final state: {}", r.final_state);
        println!("  Position: {:.1}s", r.position);

        println!("\nEvents:");
        for record in &r.events {
            let marker = if record.subscribed { "" } else { " (unsubscribed)" };
            println!(
                "  {:>3}. {} {}{}",
                record.sequence,
                record.timestamp.format("%H:%M:%S%.3f"),
                record.event,
                marker
            );
        }

        println!("\nAttributes:");
        for (name, value) in &r.attributes {
            println!("  {}: {}", name, value);
        }
    });
    Ok(())
}
