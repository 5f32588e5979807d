//! testermatching: testers file bugs against devices; the site ranks testers
//! by how many bugs they have found on a chosen set of devices.

use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod forms;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod schema;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};

/// Assemble the application: pool (with migrations applied), templates,
/// routes and catchers.
pub fn build_rocket(config: &Config) -> Result<Rocket<Build>> {
    let pool = db::setup_connection_pool(config)?;

    Ok(rocket::custom(config.figment())
        .manage(pool)
        .attach(Template::fairing())
        .mount("/", routes::routes())
        .register("/", routes::catchers()))
}
