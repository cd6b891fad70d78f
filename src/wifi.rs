//! Wi-Fi status, scanning, and provisioning via shelled-out network tools.
//!
//! Mirrors the primary/fallback tool chains of the system this was ported
//! from: NetworkManager's `nmcli` is tried first everywhere, falling back
//! to `iwgetid`/`iwlist`/`wpa_cli` when it isn't installed.

use std::collections::HashSet;
use std::net::UdpSocket;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::WifiError;

#[derive(Debug, Clone, Serialize)]
pub struct WifiNetwork {
    pub ssid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WifiStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WifiConfigResult {
    pub ok: bool,
    pub ssid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Best-effort local IPv4 address: connects a UDP socket toward a
/// routable-but-unreachable address and reads back the endpoint the kernel
/// picked. No packet is ever actually sent.
pub fn local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("10.255.255.255:1").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}

async fn run(program: &str, args: &[&str], timeout_s: u64) -> Result<std::process::Output, WifiError> {
    match timeout(Duration::from_secs(timeout_s), Command::new(program).args(args).output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(error)) if error.kind() == std::io::ErrorKind::NotFound => Err(WifiError::ToolNotFound),
        Ok(Err(error)) => Err(WifiError::Io(error)),
        Err(_elapsed) => Err(WifiError::ToolFailed(format!("{program} timed out"))),
    }
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|name| !name.is_empty())
}

/// Reports the currently associated network and the host's own address.
pub async fn status() -> Result<WifiStatus, WifiError> {
    let mut status = WifiStatus {
        ip: local_ip(),
        hostname: hostname(),
        ..Default::default()
    };

    match run("nmcli", &["-t", "-f", "ACTIVE,SSID,SIGNAL", "dev", "wifi"], 5).await {
        Ok(output) => {
            let text = String::from_utf8_lossy(&output.stdout);
            for line in text.lines() {
                let parts: Vec<&str> = line.split(':').collect();
                if parts.first() == Some(&"yes") && parts.len() >= 2 {
                    status.ssid = Some(parts[1].to_string());
                    status.signal = parts.get(2).and_then(|s| s.parse().ok());
                    break;
                }
            }
        }
        Err(WifiError::ToolNotFound) => {
            if let Ok(output) = run("iwgetid", &["-r"], 5).await {
                let ssid = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !ssid.is_empty() {
                    status.ssid = Some(ssid);
                }
            }
        }
        Err(_) => {}
    }

    Ok(status)
}

/// Rescans for nearby networks, deduplicated by SSID.
pub async fn scan() -> Result<Vec<WifiNetwork>, WifiError> {
    match run("nmcli", &["dev", "wifi", "rescan"], 10).await {
        Ok(_) => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let output = run(
                "nmcli",
                &["-t", "-f", "SSID,SIGNAL,SECURITY", "dev", "wifi", "list"],
                10,
            )
            .await?;
            let text = String::from_utf8_lossy(&output.stdout);
            let mut seen = HashSet::new();
            let mut networks = Vec::new();
            for line in text.lines() {
                let parts: Vec<&str> = line.split(':').collect();
                let Some(ssid) = parts.first().filter(|s| !s.is_empty()) else {
                    continue;
                };
                if !seen.insert(ssid.to_string()) {
                    continue;
                }
                networks.push(WifiNetwork {
                    ssid: ssid.to_string(),
                    signal: parts.get(1).and_then(|s| s.parse().ok()),
                    security: parts.get(2).filter(|s| !s.is_empty()).map(|s| s.to_string()),
                });
            }
            Ok(networks)
        }
        Err(WifiError::ToolNotFound) => scan_fallback().await,
        Err(error) => Err(error),
    }
}

async fn scan_fallback() -> Result<Vec<WifiNetwork>, WifiError> {
    let output = run("iwlist", &["wlan0", "scan"], 15).await?;
    let text = String::from_utf8_lossy(&output.stdout);
    let mut seen = HashSet::new();
    let mut networks = Vec::new();
    for line in text.lines() {
        let Some(start) = line.find("ESSID:\"") else {
            continue;
        };
        let rest = &line[start + 7..];
        let Some(end) = rest.find('"') else {
            continue;
        };
        let ssid = &rest[..end];
        if !ssid.is_empty() && seen.insert(ssid.to_string()) {
            networks.push(WifiNetwork {
                ssid: ssid.to_string(),
                signal: None,
                security: None,
            });
        }
    }
    Ok(networks)
}

/// Joins `ssid`, trying `nmcli` first and falling back to driving
/// `wpa_cli` directly when NetworkManager isn't present.
pub async fn config(ssid: &str, password: Option<&str>) -> Result<WifiConfigResult, WifiError> {
    let mut args = vec!["dev", "wifi", "connect", ssid];
    if let Some(password) = password {
        args.push("password");
        args.push(password);
    }
    match run("nmcli", &args, 30).await {
        Ok(output) if output.status.success() => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(WifiConfigResult {
                ok: true,
                ssid: ssid.to_string(),
                ip: local_ip(),
            })
        }
        Ok(output) => Err(WifiError::ToolFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        )),
        Err(WifiError::ToolNotFound) => config_via_wpa_cli(ssid, password).await,
        Err(error) => Err(error),
    }
}

async fn config_via_wpa_cli(ssid: &str, password: Option<&str>) -> Result<WifiConfigResult, WifiError> {
    let added = run("wpa_cli", &["-i", "wlan0", "add_network"], 10).await?;
    let network_id = String::from_utf8_lossy(&added.stdout).trim().to_string();

    let quoted_ssid = format!("\"{ssid}\"");
    run(
        "wpa_cli",
        &["-i", "wlan0", "set_network", &network_id, "ssid", &quoted_ssid],
        10,
    )
    .await?;

    if let Some(password) = password {
        let quoted_password = format!("\"{password}\"");
        run(
            "wpa_cli",
            &["-i", "wlan0", "set_network", &network_id, "psk", &quoted_password],
            10,
        )
        .await?;
    } else {
        run(
            "wpa_cli",
            &["-i", "wlan0", "set_network", &network_id, "key_mgmt", "NONE"],
            10,
        )
        .await?;
    }

    run("wpa_cli", &["-i", "wlan0", "enable_network", &network_id], 10).await?;
    run("wpa_cli", &["-i", "wlan0", "save_config"], 10).await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    Ok(WifiConfigResult {
        ok: true,
        ssid: ssid.to_string(),
        ip: local_ip(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ip_resolves_to_some_address_in_test_environments() {
        // Best-effort: sandboxes without outbound routing return None, which
        // callers already treat as "unknown" rather than an error.
        let _ = local_ip();
    }
}
