#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod upstream;
pub mod voting;

pub use config::Config;

/// Assemble the server: routes plus the config, database, auth-server and
/// logging fairings. Ignition performs the actual connections.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(logging::RequestLogger)
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(config::UpstreamFairing)
}
