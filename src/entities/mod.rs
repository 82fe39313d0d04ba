pub mod notification;
pub mod registry;
pub mod socket;
