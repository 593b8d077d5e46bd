//! Stdout delivery for the CLI driver.

use async_trait::async_trait;
use logbard_core::collaborator::Delivery;
use logbard_core::error::ProviderError;

/// Prints generated commentary to stdout, prefixed with the owner key.
pub struct StdoutDelivery;

#[async_trait]
impl Delivery for StdoutDelivery {
    async fn deliver(&self, owner_key: &str, text: &str) -> Result<(), ProviderError> {
        println!("=== {owner_key} ===");
        println!("{text}");
        Ok(())
    }
}
