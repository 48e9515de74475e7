//! Registry profile command

use super::Settings;
use peerbox_core::RegistryGateway;

pub async fn handle(asn: u32, settings: &Settings) -> Result<(), String> {
    let registry = settings.registry();
    let profile = registry
        .asn_profile(asn)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("AS{} not found in the registry", asn))?;
    println!("{}", crate::render::profile_panel(&profile));
    Ok(())
}
