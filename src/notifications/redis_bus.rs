//! Bus sobre Redis pub/sub
//!
//! `publish` solo encola; una única tarea en background drena la cola y hace
//! `PUBLISH` en orden, así el orden de commit por viaje se conserva y el
//! llamador nunca espera a Redis.

use anyhow::Result;
use redis::{aio::ConnectionManager, AsyncCommands};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{Channel, NotificationBus, RideEvent};

#[derive(Debug)]
struct Outgoing {
    channel: String,
    payload: String,
}

#[derive(Clone)]
pub struct RedisBus {
    sender: mpsc::UnboundedSender<Outgoing>,
    prefix: String,
}

impl RedisBus {
    /// Conectar a Redis y arrancar el publicador en background
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<(Self, JoinHandle<()>)> {
        info!("🔗 Conectando bus de notificaciones a Redis: {}", redis_url);

        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
        info!("✅ Redis conectado exitosamente");

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_publisher(manager, receiver));

        Ok((
            Self {
                sender,
                prefix: prefix.to_string(),
            },
            worker,
        ))
    }

    fn channel_key(&self, channel: &Channel) -> String {
        if self.prefix.is_empty() {
            channel.name()
        } else {
            format!("{}:{}", self.prefix, channel.name())
        }
    }
}

async fn run_publisher(mut manager: ConnectionManager, mut receiver: mpsc::UnboundedReceiver<Outgoing>) {
    while let Some(message) = receiver.recv().await {
        let result: redis::RedisResult<i64> = manager
            .publish(&message.channel, &message.payload)
            .await;
        match result {
            Ok(receivers) => debug!("📣 PUBLISH {} ({} receptores)", message.channel, receivers),
            // At-most-once: un fallo de publicación no se reintenta
            Err(e) => warn!("⚠️ Error publicando en {}: {}", message.channel, e),
        }
    }
    info!("👋 Publicador de notificaciones detenido");
}

impl NotificationBus for RedisBus {
    fn publish(&self, channel: &Channel, event: &RideEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("❌ No se pudo serializar {}: {}", event.kind.as_str(), e);
                return;
            }
        };

        let outgoing = Outgoing {
            channel: self.channel_key(channel),
            payload,
        };
        if self.sender.send(outgoing).is_err() {
            warn!("⚠️ Publicador detenido, evento {} descartado", event.kind.as_str());
        }
    }
}
