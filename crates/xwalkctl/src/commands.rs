//! Subcommands that talk to a running controller.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;
use xwalkconf::XwalkConfig;
use xwalkproto::client::ClientConfig;
use xwalkproto::{
    ApiClient, ApiRequest, ApiResponse, ComponentRole, ComponentStatus, ControlCommand,
    InteractionKind, StationPublisher, StatusSnapshot,
};

async fn request(config: &XwalkConfig, request: ApiRequest) -> Result<ApiResponse> {
    let mut client = ApiClient::connect(ClientConfig::from_config(config))?;
    debug!(endpoint = client.endpoint(), request_id = %request.request_id, "Sending API request");
    client.request(&request).await
}

fn print_json(response: &ApiResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(response).context("Failed to render reply")?;
    println!("{}", text);
    Ok(())
}

/// Print the reply and turn an unsuccessful one into an error exit.
fn finish(response: &ApiResponse, json: bool) -> Result<()> {
    if json {
        print_json(response)?;
    } else if response.success {
        println!("{}", response.message);
        if let Some(command) = &response.command {
            print_command(command);
        }
    }
    if !response.success {
        bail!("controller refused request: {}", response.message);
    }
    Ok(())
}

fn print_command(command: &ControlCommand) {
    println!("  command: {:?} -> {:?}", command.kind, command.target);
    if let Some(walk) = &command.walk {
        println!("  walk:    {}", walk);
    }
    if let Some(category) = &command.category {
        println!("  category: {}", category);
    }
    let clip = |c: &Option<String>| c.clone().unwrap_or_else(|| "-".to_string());
    println!(
        "  intro: {}  outro: {}  audio: {}",
        clip(&command.intro),
        clip(&command.outro),
        clip(&command.audio)
    );
}

fn print_status(status: &StatusSnapshot) {
    println!("state:          {}", status.state);
    println!("active profile: {}", status.active_profile);
    println!("uptime:         {}s", status.uptime_secs);
    println!("selections:     {}", status.selections);
    if let Some(last) = &status.last_selection {
        println!(
            "last selection: {} ({}) at {}",
            last.walk,
            last.category,
            last.selected_at.to_rfc3339()
        );
    }

    if status.components.is_empty() {
        println!("components:     none");
        return;
    }
    println!("components:");
    for (id, report) in &status.components {
        let seen = report
            .last_heartbeat
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<24} {:<8} {:<14} {:<20} {}",
            id,
            report.status.to_string(),
            report.role.as_str(),
            report.host.as_deref().unwrap_or("-"),
            seen
        );
    }

    let stale: Vec<&str> = status.with_status(ComponentStatus::Stale).collect();
    if !stale.is_empty() {
        println!("stale: {}", stale.join(", "));
    }
}

pub async fn status(config: &XwalkConfig, json: bool) -> Result<()> {
    let response = request(config, ApiRequest::status_query()).await?;
    if json {
        return finish(&response, true);
    }
    match &response.status {
        Some(status) if response.success => {
            print_status(status);
            Ok(())
        }
        _ => finish(&response, false),
    }
}

pub async fn trigger(config: &XwalkConfig, walk: Option<String>, json: bool) -> Result<()> {
    let response = request(config, ApiRequest::manual_trigger(walk)).await?;
    finish(&response, json)
}

pub async fn reset(config: &XwalkConfig, json: bool) -> Result<()> {
    let response = request(config, ApiRequest::reset()).await?;
    finish(&response, json)
}

pub async fn interaction(config: &XwalkConfig, kind: InteractionKind, source: &str) -> Result<()> {
    let connect = &config.infra.connect;
    let mut publisher = StationPublisher::connect(&connect.interactions, connect.hostname.clone())?;
    publisher.settle().await;
    publisher.interaction(kind, source).await?;
    println!("{} from {} -> {}", kind, source, connect.interactions);
    Ok(())
}

pub async fn beat(
    config: &XwalkConfig,
    component: &str,
    role: Option<ComponentRole>,
    count: u32,
    every: Duration,
) -> Result<()> {
    let connect = &config.infra.connect;
    let mut publisher = StationPublisher::connect(&connect.heartbeats, connect.hostname.clone())?;
    publisher.settle().await;

    for n in 0..count {
        if n > 0 {
            tokio::time::sleep(every).await;
        }
        publisher.heartbeat(component, role, n == 0).await?;
        println!("heartbeat {}/{} from {}", n + 1, count, component);
    }
    Ok(())
}
