//! JSON form of the search results.

use rocket::get;
use rocket::http::Status;
use rocket::serde::json::Json;
use serde_json::{json, Value};

use crate::db::Db;
use crate::search::{self, parse_device_list, CountryFilter, SearchResults};

type ApiResult<T> = Result<Json<T>, (Status, Json<Value>)>;

fn api_error(status: Status, message: impl Into<String>) -> (Status, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

#[get("/api/results/<country>/<devices>")]
pub async fn results(db: Db, country: &str, devices: &str) -> ApiResult<SearchResults> {
    let filter = CountryFilter::parse(country).ok_or_else(|| {
        api_error(Status::BadRequest, format!("invalid country '{}'", country))
    })?;
    let device_ids = parse_device_list(devices).ok_or_else(|| {
        api_error(Status::BadRequest, format!("invalid device list '{}'", devices))
    })?;

    db.run(move |conn| search::search(conn, &filter, &device_ids))
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Search failed: {}", e);
            api_error(Status::InternalServerError, "search failed")
        })
}
