use std::time::Duration;

use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::upstream::AuthServer;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
///
/// The auth-server location is explicit configuration rather than an
/// ambient environment read, so tests and deployments can point the backend
/// anywhere without touching process state.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_server_url: String,
    upstream_timeout: u32,
}

impl Config {
    /// Base URL of the external identity/auth server.
    pub fn auth_server_url(&self) -> &str {
        &self.auth_server_url
    }

    /// Per-request timeout for auth-server calls, in seconds.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout.into())
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the indexes exist, and places both a `Client` and a `Database`
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "whispervote".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// A fairing that builds the auth-server client from the application config
/// and places it into managed state.
pub struct UpstreamFairing;

#[rocket::async_trait]
impl Fairing for UpstreamFairing {
    fn info(&self) -> Info {
        Info {
            name: "Auth server",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load auth server config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let auth_server = match AuthServer::new(
            config.auth_server_url().to_string(),
            config.upstream_timeout(),
        ) {
            Ok(auth_server) => auth_server,
            Err(e) => {
                error!("Failed to build auth server client: {e}");
                return Err(rocket);
            }
        };
        info!(
            "Auth server client ready for {}",
            config.auth_server_url()
        );

        rocket = rocket.manage(auth_server);
        Ok(rocket)
    }
}
