//! Application services (driving/inbound ports).

pub mod console_service;
