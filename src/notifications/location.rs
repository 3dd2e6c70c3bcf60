use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use super::PartnerLocation;

/// Última ubicación por viaje. Last-write-wins, solo en memoria.
#[derive(Debug, Default)]
pub struct LocationTracker {
    latest: RwLock<HashMap<Uuid, PartnerLocation>>,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, location: PartnerLocation) {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        latest.insert(location.ride_id, location);
    }

    pub fn last(&self, ride_id: Uuid) -> Option<PartnerLocation> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        latest.get(&ride_id).cloned()
    }

    pub fn forget(&self, ride_id: Uuid) {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        latest.remove(&ride_id);
    }
}
