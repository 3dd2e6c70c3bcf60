//! Fan-out de notificaciones
//!
//! El núcleo recibe el transporte inyectado como `Arc<dyn NotificationBus>`;
//! nunca hay un handle global. La entrega es fire-and-forget, como mucho una
//! vez por suscriptor conectado, sin persistencia.

pub mod broadcast_bus;
pub mod channel;
pub mod event;
pub mod location;
pub mod redis_bus;

pub use broadcast_bus::BroadcastBus;
pub use channel::Channel;
pub use event::{EventPayload, PartnerLocation, RideEvent, RideEventKind};
pub use location::LocationTracker;
pub use redis_bus::RedisBus;

/// Transporte de publicación. No bloquea y nunca falla hacia el llamador:
/// los errores se registran dentro de cada implementación.
pub trait NotificationBus: Send + Sync {
    fn publish(&self, channel: &Channel, event: &RideEvent);
}
