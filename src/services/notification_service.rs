//! Ruteo del fan-out
//!
//! Decide qué evento va a qué canal para cada transición. Siempre se llama
//! después del commit en el store, desde la misma tarea, así los eventos de
//! un viaje salen en el orden en que se confirmaron sus transiciones.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Identity, Ride, RideStatus};
use crate::notifications::{
    Channel, LocationTracker, NotificationBus, PartnerLocation, RideEvent, RideEventKind,
};

pub struct NotificationService {
    bus: Arc<dyn NotificationBus>,
    locations: LocationTracker,
}

impl NotificationService {
    pub fn new(bus: Arc<dyn NotificationBus>) -> Self {
        Self {
            bus,
            locations: LocationTracker::new(),
        }
    }

    fn emit(&self, channels: &[Channel], event: &RideEvent) {
        for channel in channels {
            self.bus.publish(channel, event);
        }
        debug!(
            "📣 {} para ride {} en {} canales",
            event.kind.as_str(),
            event.ride_id,
            channels.len()
        );
    }

    fn notify_admins(&self, ride: &Ride) {
        let event = RideEvent::for_ride(
            RideEventKind::RideStatusChanged,
            ride,
            format!("Ride {} is now {}", ride.id, ride.status),
        );
        self.emit(&[Channel::Admins], &event);
    }

    pub fn ride_created(&self, ride: &Ride) {
        let created = RideEvent::for_ride(
            RideEventKind::RideCreated,
            ride,
            "Your ride request has been created",
        );
        self.emit(&[Channel::User(ride.user_id)], &created);

        let request = RideEvent::for_ride(
            RideEventKind::NewRideRequest,
            ride,
            format!("New ride request: {} -> {}", ride.pickup_address, ride.drop_address),
        );
        self.emit(&[Channel::OnlinePartners], &request);

        self.notify_admins(ride);
    }

    pub fn ride_accepted(&self, ride: &Ride) {
        let accepted = RideEvent::for_ride(
            RideEventKind::RideAccepted,
            ride,
            "A partner has accepted your ride",
        );
        self.emit(&[Channel::User(ride.user_id), Channel::Ride(ride.id)], &accepted);

        if let Some(partner_id) = ride.partner_id {
            let assigned = RideEvent::for_ride(
                RideEventKind::RideAssigned,
                ride,
                "Ride assigned to you",
            );
            self.emit(&[Channel::Partner(partner_id)], &assigned);
        }

        self.notify_admins(ride);
    }

    /// ARRIVED, STARTED y COMPLETED comparten el mismo ruteo
    pub fn ride_progressed(&self, ride: &Ride) {
        let (kind, message) = match ride.status {
            RideStatus::Arrived => (RideEventKind::RideArrived, "Your partner has arrived"),
            RideStatus::Started => (RideEventKind::RideStarted, "Your ride has started"),
            RideStatus::Completed => (RideEventKind::RideCompleted, "Your ride is complete"),
            _ => return,
        };

        let mut channels = vec![Channel::User(ride.user_id)];
        if let Some(partner_id) = ride.partner_id {
            channels.push(Channel::Partner(partner_id));
        }
        channels.push(Channel::Ride(ride.id));

        self.emit(&channels, &RideEvent::for_ride(kind, ride, message));
        self.notify_admins(ride);

        if ride.status == RideStatus::Completed {
            self.locations.forget(ride.id);
        }
    }

    /// `before` es el snapshot previo al cancel: conserva al partner asignado
    pub fn ride_cancelled(&self, before: &Ride, after: &Ride, by: &Identity) {
        let (kind, message) = match by {
            Identity::Partner(_) => (
                RideEventKind::RideCancelledByPartner,
                "The ride was cancelled by the partner",
            ),
            Identity::User(_) => (
                RideEventKind::RideCancelledByUser,
                "The ride was cancelled by the rider",
            ),
            _ => (
                RideEventKind::RideCancelledByAdmin,
                "The ride was cancelled by the operations team",
            ),
        };

        let mut channels = vec![Channel::User(after.user_id)];
        if let Some(partner_id) = before.partner_id {
            channels.push(Channel::Partner(partner_id));
        }
        channels.push(Channel::Ride(after.id));
        if before.status == RideStatus::Pending {
            // Los partners en línea tenían la solicitud abierta
            channels.push(Channel::OnlinePartners);
        }

        self.emit(&channels, &RideEvent::for_ride(kind, after, message));
        self.notify_admins(after);
        self.locations.forget(after.id);
    }

    pub fn partner_location(
        &self,
        ride_id: Uuid,
        partner_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> PartnerLocation {
        let location = PartnerLocation {
            ride_id,
            partner_id,
            latitude,
            longitude,
            recorded_at: Utc::now(),
        };
        self.locations.record(location.clone());
        self.bus.publish(
            &Channel::Ride(ride_id),
            &RideEvent::for_location(location.clone()),
        );
        location
    }

    pub fn last_location(&self, ride_id: Uuid) -> Option<PartnerLocation> {
        self.locations.last(ride_id)
    }
}
