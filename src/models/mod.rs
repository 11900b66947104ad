pub mod ride_request;
pub mod trip;
pub mod user;
