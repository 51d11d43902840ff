pub mod event;
pub mod parcel;
pub mod station;
