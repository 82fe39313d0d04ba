pub mod api;
pub mod auth;
pub mod notification_service;
pub mod notifier;
pub mod socket_service;
