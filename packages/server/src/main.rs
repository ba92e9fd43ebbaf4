#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the statmap API server.

#[actix_web::main]
async fn main() -> Result<(), statmap_server::ServerError> {
    statmap_server::run_server().await
}
