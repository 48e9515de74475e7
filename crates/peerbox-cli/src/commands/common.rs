//! Common exchange listing

use super::Settings;
use peerbox_core::{common_exchanges, RegistryGateway};

pub async fn handle(peer_asn: u32, settings: &Settings) -> Result<(), String> {
    let operator_asn = settings.require_operator_asn()?;
    let registry = settings.registry();

    let remote = registry
        .exchange_presence(peer_asn)
        .await
        .map_err(|e| e.to_string())?;
    let local = registry
        .exchange_presence(operator_asn)
        .await
        .map_err(|e| e.to_string())?;

    let matches = common_exchanges(&local, &remote);
    if matches.is_empty() {
        println!(
            "No common exchanges between AS{} and AS{}.",
            operator_asn, peer_asn
        );
        return Ok(());
    }
    println!("{}", crate::render::match_table(&matches));
    Ok(())
}
