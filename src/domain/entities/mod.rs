pub mod asset;
pub mod contact_me;
pub mod document;
pub mod resource;
pub mod schema;
pub mod token;
