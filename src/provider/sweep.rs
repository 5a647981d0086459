//! Sweeper
//!
//! Deletes remote objects left behind by acceptance runs. Every object whose
//! name starts with the prefix is removed. Failures are logged and kept in
//! the report next to the objects that were deleted.

use super::{Provider, ResourceData, ResourceKind, State};

/// Name prefix used by acceptance test configurations
pub const DEFAULT_SWEEP_PREFIX: &str = "terraform-";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// `(kind, id, name)` of every deleted object
    pub deleted: Vec<(ResourceKind, String, String)>,
    /// `(kind, id, error)` of every failed listing or deletion. The id is
    /// empty when listing the kind failed.
    pub failed: Vec<(ResourceKind, String, String)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Provider {
    /// Delete every object whose name starts with `prefix`, one at a time.
    /// Failures are recorded and the sweep moves on to the next object.
    pub async fn sweep(&self, prefix: &str) -> SweepReport {
        let mut report = SweepReport::default();

        // Objects users first, the same order the acceptance sweepers use
        for kind in [ResourceKind::ObjectsUser, ResourceKind::LoadBalancer] {
            let names = match kind {
                ResourceKind::LoadBalancer => self.load_balancers().names().await,
                ResourceKind::ObjectsUser => self.objects_users().names().await,
            };
            let names = match names {
                Ok(names) => names,
                Err(err) => {
                    tracing::error!("Failed to list {}s: {:#}", kind, err);
                    report.failed.push((kind, String::new(), format!("{:#}", err)));
                    continue;
                }
            };

            for (id, name) in names.into_iter().filter(|(_, name)| name.starts_with(prefix)) {
                tracing::info!("Destroying {} {:?}", kind, name);
                let mut d = ResourceData::from_state(id.as_str(), State::new());

                match self.delete(kind, &mut d).await {
                    Ok(()) => report.deleted.push((kind, id, name)),
                    Err(err) => {
                        tracing::error!("Failed to sweep {} {}: {:#}", kind, id, err);
                        report.failed.push((kind, id, format!("{:#}", err)));
                    }
                }
            }
        }

        report
    }
}
