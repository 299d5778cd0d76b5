//! Identity resolver: maps a device id to the target identity it is
//! reachable under on the messaging fabric.

use relayhub_domain::device::{DeviceKind, DeviceRecord};
use relayhub_domain::id::{DeviceId, TargetIdentity};

use crate::ports::DeviceDirectory;

/// Resolves target identities through sensor metadata first, then through
/// the device hierarchy.
///
/// Store failures are logged and treated as a miss for the step that hit
/// them; resolution itself never errors, it either finds an identity or
/// reports `None`.
pub struct IdentityResolver<D> {
    directory: D,
}

impl<D: DeviceDirectory> IdentityResolver<D> {
    /// Create a resolver backed by the given directory.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Resolve `device_id` to its target identity.
    ///
    /// Order, first success wins:
    /// 1. sensor metadata mapping;
    /// 2. device records with that id, in the order the directory returns
    ///    them. A `dependent` record ends the search: its independent parent
    ///    in the same space decides the outcome.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, device_id: &DeviceId) -> Option<TargetIdentity> {
        match self.directory.find_sensor_metadata(device_id).await {
            Ok(Some(metadata)) => {
                if let Some(target) = metadata.target_identity {
                    tracing::debug!(%target, "resolved through sensor metadata");
                    return Some(target);
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "sensor metadata lookup failed"),
        }

        let candidates = match self.directory.find_by_device_id(device_id).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(error = %err, "device lookup failed");
                return None;
            }
        };

        for record in candidates {
            match record.kind {
                DeviceKind::Dependent => return self.resolve_through_parent(&record).await,
                DeviceKind::Independent | DeviceKind::Other(_) => {
                    if let Some(target) = record.target_identity {
                        return Some(target);
                    }
                    tracing::debug!(space_id = %record.space_id, kind = %record.kind, "record has no target identity");
                }
            }
        }

        tracing::debug!("no target identity");
        None
    }

    async fn resolve_through_parent(&self, record: &DeviceRecord) -> Option<TargetIdentity> {
        let Some(parent_id) = &record.parent_id else {
            tracing::debug!(space_id = %record.space_id, "dependent device without parent");
            return None;
        };

        match self
            .directory
            .find_in_space(record.space_id, parent_id, &DeviceKind::Independent)
            .await
        {
            Ok(Some(parent)) => parent.target_identity,
            Ok(None) => {
                tracing::debug!(%parent_id, "parent device missing");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, %parent_id, "parent lookup failed");
                None
            }
        }
    }
}
