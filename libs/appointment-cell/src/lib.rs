pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    AppointmentDetail, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    BookingChannel, BookingOptions,
};
pub use router::{appointment_routes, AppointmentState};
