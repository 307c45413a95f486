pub mod geofencing_service;

pub use geofencing_service::{Geofence, GeofencingService, ServiceError, TransitionTarget};
