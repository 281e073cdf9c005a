//! Shipping domain module: parcels and their tracking history.

pub mod parcel;

pub use parcel::{ensure_shippable, validate_tracking_number, Parcel, ParcelEvent, ParcelStatus};
