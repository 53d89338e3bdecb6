pub mod booking;
pub mod car;

pub use booking::{Booking, BookingInput, BookingStatus, DateChange};
pub use car::{Car, CarInput};
