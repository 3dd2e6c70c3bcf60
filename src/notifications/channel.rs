use std::fmt;
use uuid::Uuid;

/// Canales con nombre del fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    User(Uuid),
    Partner(Uuid),
    /// Broadcast para todos los admins conectados
    Admins,
    /// Broadcast para todos los partners en línea
    OnlinePartners,
    /// Canal efímero de quien sigue un viaje concreto
    Ride(Uuid),
}

impl Channel {
    pub fn name(&self) -> String {
        match self {
            Channel::User(id) => format!("user:{}", id),
            Channel::Partner(id) => format!("partner:{}", id),
            Channel::Admins => "admins".to_string(),
            Channel::OnlinePartners => "partners:online".to_string(),
            Channel::Ride(id) => format!("ride:{}", id),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        let id = Uuid::nil();
        assert_eq!(
            Channel::User(id).name(),
            "user:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(Channel::Admins.name(), "admins");
        assert_eq!(Channel::OnlinePartners.to_string(), "partners:online");
    }
}
