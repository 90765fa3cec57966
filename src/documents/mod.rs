//! Documents stored in the hotel index

mod geo;
mod hotel;

pub use geo::GeoPoint;
pub use hotel::HotelDocument;
