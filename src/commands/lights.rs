use crate::bridge::{BridgeConfig, HttpBridge};
use crate::commands::block_on;
use crate::error::Result;
use crate::migrate::LightInventory;
use crate::output::{Format, print_lights};

/// List every light with its ids on both APIs, to pick the pair to migrate.
pub fn run(config: BridgeConfig, format: Format) -> Result<()> {
    let bridge = HttpBridge::new(config)?;
    let inventory = block_on(LightInventory::fetch(&bridge))??;
    print_lights(&inventory.lights(), format)
}
