//! Scale-set instance deletion
//!
//! Scale-set instance lifecycle is owned by the scale set itself, so there
//! is no retry or compensation here: look the instance up, delete it if it
//! is present, and treat absence as a successful no-op.

use nimbus_cloud::{CloudClient, InstanceId, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ScaleSetManager {
    client: Arc<dyn CloudClient>,
}

impl ScaleSetManager {
    pub fn new(client: Arc<dyn CloudClient>) -> Self {
        Self { client }
    }

    pub async fn delete(&self, id: &InstanceId) -> Result<()> {
        match self.client.get_vmss_instance(id).await? {
            Some(instance) => {
                info!("Deleting scale-set instance '{}'", instance.name);
                self.client.delete_vmss_instance(id).await
            }
            None => {
                debug!("Scale-set instance '{id}' not found, nothing to delete");
                Ok(())
            }
        }
    }
}
