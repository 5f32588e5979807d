//! HTTP surface.

use rocket::http::Status;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::{Catcher, Request, Route};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::Error;

mod api;
mod devtools;
mod pages;
mod views;

pub fn routes() -> Vec<Route> {
    rocket::routes![
        pages::index,
        pages::index_alias,
        pages::submit_search,
        pages::results,
        pages::bug,
        pages::device,
        pages::tester,
        devtools::devtools,
        devtools::choose_tool,
        devtools::add_page,
        devtools::add_bug,
        devtools::add_device,
        devtools::add_tester,
        devtools::add_unknown,
        devtools::edit_page,
        devtools::edit_bug,
        devtools::edit_device,
        devtools::edit_tester,
        devtools::edit_unknown,
        devtools::delete_page,
        devtools::delete,
        api::results,
    ]
}

pub fn catchers() -> Vec<Catcher> {
    rocket::catchers![not_found, internal_error, unavailable]
}

pub const HOME: &str = "/";
pub const DEVTOOLS: &str = "/devtools";

/// Any page a handler can answer with.
#[derive(rocket::Responder)]
pub enum Reply {
    Page(Template),
    Rejected((Status, Template)),
    Redirect(Flash<Redirect>),
    Moved(Redirect),
    Failed(Status),
}

impl Reply {
    pub fn success(to: impl Into<String>, message: impl Into<String>) -> Self {
        Reply::Redirect(Flash::success(Redirect::to(to.into()), message.into()))
    }

    pub fn flash(to: impl Into<String>, message: impl Into<String>) -> Self {
        Reply::Redirect(Flash::error(Redirect::to(to.into()), message.into()))
    }

    /// User-facing errors go back to `to` with a flash; the rest are logged
    /// and answered with a bare status.
    pub fn from_error(err: Error, to: impl Into<String>) -> Self {
        if err.is_user_facing() {
            warn!("Request rejected: {}", err);
            return Reply::flash(to, err.to_string());
        }
        error!("Request failed: {}", err);
        match err {
            Error::Pool(_) => Reply::Failed(Status::ServiceUnavailable),
            _ => Reply::Failed(Status::InternalServerError),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlashView {
    pub kind: String,
    pub message: String,
}

pub fn flash_view(flash: Option<FlashMessage<'_>>) -> Option<FlashView> {
    flash.map(|f| FlashView {
        kind: f.kind().to_string(),
        message: f.message().to_string(),
    })
}

#[rocket::catch(404)]
fn not_found(req: &Request<'_>) -> Template {
    Template::render(
        "error",
        context! {
            title: "Not Found",
            status: 404,
            message: format!("Nothing lives at {}", req.uri()),
        },
    )
}

#[rocket::catch(500)]
fn internal_error() -> Template {
    Template::render(
        "error",
        context! {
            title: "Server Error",
            status: 500,
            message: "Something went wrong on our end.",
        },
    )
}

#[rocket::catch(503)]
fn unavailable() -> Template {
    Template::render(
        "error",
        context! {
            title: "Unavailable",
            status: 503,
            message: "The database is busy, try again shortly.",
        },
    )
}
