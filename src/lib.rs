pub mod app;
pub mod aws;
pub mod config;
pub mod credentials;
pub mod duration;
pub mod models;
pub mod saml;
