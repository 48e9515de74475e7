//! Config commands

use crate::config::Config;
use crate::ConfigCommands;

pub async fn handle(action: ConfigCommands) -> Result<(), String> {
    match action {
        ConfigCommands::Init => {
            let config = Config::default();
            config.save()?;
            println!("Configuration initialized at ~/.peerbox/config.toml");
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(None).unwrap_or_default();
            match key.as_str() {
                "netbox_url" => config.netbox_url = Some(value),
                "netbox_token" => config.netbox_token = Some(value),
                "peeringdb_api_key" => config.peeringdb_api_key = Some(value),
                "operator_asn" => {
                    let asn = value
                        .parse()
                        .map_err(|_| format!("'{}' is not a valid ASN", value))?;
                    config.operator_asn = Some(asn);
                }
                "peer_group" => config.peer_group = Some(value),
                _ => return Err(format!("Unknown config key: {}", key)),
            }
            config.save()?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(None).unwrap_or_default();
            let value = match key.as_str() {
                "netbox_url" => config.netbox_url,
                "netbox_token" => config.netbox_token.map(mask),
                "peeringdb_api_key" => config.peeringdb_api_key.map(mask),
                "operator_asn" => config.operator_asn.map(|a| a.to_string()),
                "peer_group" => config.peer_group,
                _ => return Err(format!("Unknown config key: {}", key)),
            };
            println!("{}: {}", key, value.unwrap_or_else(|| "(not set)".into()));
        }
        ConfigCommands::List => {
            let config = Config::load(None).unwrap_or_default();
            println!(
                "netbox_url: {}",
                config.netbox_url.unwrap_or_else(|| "(not set)".into())
            );
            println!(
                "netbox_token: {}",
                config
                    .netbox_token
                    .map(mask)
                    .unwrap_or_else(|| "(not set)".into())
            );
            println!(
                "peeringdb_api_key: {}",
                config
                    .peeringdb_api_key
                    .map(mask)
                    .unwrap_or_else(|| "(not set)".into())
            );
            println!(
                "operator_asn: {}",
                config
                    .operator_asn
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "(not set)".into())
            );
            println!(
                "peer_group: {}",
                config.peer_group.unwrap_or_else(|| "(not set)".into())
            );
        }
    }
    Ok(())
}

fn mask(secret: String) -> String {
    format!("{}****", &secret[..8.min(secret.len())])
}
