//! Bus en proceso sobre `tokio::sync::broadcast`
//!
//! Un canal broadcast por nombre de canal. Quien no está suscrito en el
//! momento del publish simplemente pierde el evento: no hay buffer de replay.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{Channel, NotificationBus, RideEvent};

pub const DEFAULT_CAPACITY: usize = 256;
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

type ChannelsMap = Arc<RwLock<HashMap<Channel, broadcast::Sender<RideEvent>>>>;

#[derive(Clone)]
pub struct BroadcastBus {
    channels: ChannelsMap,
    capacity: usize,
}

impl BroadcastBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Suscribirse a un canal; solo recibe eventos publicados desde ahora
    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<RideEvent> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Elimina canales sin suscriptores (p. ej. canales de viajes terminados)
    pub fn prune(&self) -> usize {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    /// Poda periódica en background mientras viva el proceso
    pub fn spawn_pruner(&self, every: Duration) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = bus.prune();
                if removed > 0 {
                    debug!("🧹 {} canales sin suscriptores eliminados", removed);
                }
            }
        })
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationBus for BroadcastBus {
    fn publish(&self, channel: &Channel, event: &RideEvent) {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        match channels.get(channel) {
            Some(sender) => match sender.send(event.clone()) {
                Ok(receivers) => {
                    trace!("📣 {} -> {} ({} receptores)", event.kind.as_str(), channel, receivers)
                }
                Err(_) => debug!("📭 {} sin receptores en {}", event.kind.as_str(), channel),
            },
            None => debug!("📭 {} sin receptores en {}", event.kind.as_str(), channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{PartnerLocation, RideEvent};
    use chrono::Utc;
    use uuid::Uuid;

    fn location_event(ride_id: Uuid) -> RideEvent {
        RideEvent::for_location(PartnerLocation {
            ride_id,
            partner_id: Uuid::new_v4(),
            latitude: 1.0,
            longitude: 2.0,
            recorded_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_only_current_subscribers_receive() {
        let bus = BroadcastBus::default();
        let ride_id = Uuid::new_v4();
        let channel = Channel::Ride(ride_id);

        // Nadie escucha: el evento se pierde
        bus.publish(&channel, &location_event(ride_id));

        let mut rx = bus.subscribe(channel);
        let event = location_event(ride_id);
        bus.publish(&channel, &event);

        assert_eq!(rx.recv().await.unwrap(), event);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let bus = BroadcastBus::default();
        let mut admins = bus.subscribe(Channel::Admins);
        let mut partners = bus.subscribe(Channel::OnlinePartners);

        bus.publish(&Channel::Admins, &location_event(Uuid::new_v4()));

        assert!(admins.recv().await.is_ok());
        assert!(partners.try_recv().is_err());
    }

    #[test]
    fn test_prune_drops_idle_channels() {
        let bus = BroadcastBus::default();
        let rx = bus.subscribe(Channel::Ride(Uuid::new_v4()));
        let _admins = bus.subscribe(Channel::Admins);
        drop(rx);
        assert_eq!(bus.prune(), 1);
        assert_eq!(bus.prune(), 0);
    }

    #[tokio::test]
    async fn test_pruner_keeps_live_channels() {
        let bus = BroadcastBus::default();
        let idle = bus.subscribe(Channel::Ride(Uuid::new_v4()));
        let mut admins = bus.subscribe(Channel::Admins);
        drop(idle);

        let pruner = bus.spawn_pruner(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        pruner.abort();

        assert_eq!(bus.prune(), 0);
        bus.publish(&Channel::Admins, &location_event(Uuid::new_v4()));
        assert!(admins.recv().await.is_ok());
    }
}
