pub mod home;
pub mod resources;
pub mod uploads;
