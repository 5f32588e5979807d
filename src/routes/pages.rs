//! Browsing pages: home, search results and the detail views.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rocket::form::{Contextual, Form};
use rocket::request::FlashMessage;
use rocket::response::Redirect;
use rocket::{get, post};
use rocket_dyn_templates::{context, Template};

use super::views::{device_options, BugView, ExperienceView, RankedTester, TesterView};
use super::{flash_view, Reply, HOME};
use crate::db::Db;
use crate::error::Error;
use crate::forms::SearchInput;
use crate::models::Tester;
use crate::search::{format_device_list, parse_device_list, CountryFilter};
use crate::store;

/// Bugs shown on the home page.
const HOME_SAMPLE: usize = 10;

#[get("/")]
pub async fn index(db: Db, flash: Option<FlashMessage<'_>>) -> Reply {
    home(db, flash).await
}

#[get("/index")]
pub async fn index_alias(db: Db, flash: Option<FlashMessage<'_>>) -> Reply {
    home(db, flash).await
}

async fn home(db: Db, flash: Option<FlashMessage<'_>>) -> Reply {
    let flash = flash_view(flash);
    let loaded = db
        .run(|conn| {
            let bugs = store::all_bugs(conn)?;
            let devices = store::all_devices(conn)?;
            let testers = store::all_testers(conn)?;
            let names = store::device_names(conn)?;
            let by_id: HashMap<i32, Tester> = testers.iter().map(|t| (t.id, t.clone())).collect();

            let mut rng = rand::thread_rng();
            let sample: Vec<BugView> = bugs
                .choose_multiple(&mut rng, HOME_SAMPLE)
                .map(|bug| BugView::new(bug, &names, &by_id))
                .collect();
            let testers: Vec<TesterView> = testers.iter().map(TesterView::from).collect();
            Ok((sample, devices, testers))
        })
        .await;

    match loaded {
        Ok((bugs, devices, testers)) => Reply::Page(Template::render(
            "index",
            context! {
                title: "Home",
                flash,
                bugs,
                device_options: device_options(&devices, &[]),
                devices,
                testers,
                country: "ALL",
            },
        )),
        Err(e) => Reply::from_error(e, HOME),
    }
}

#[post("/search", data = "<form>")]
pub fn submit_search(form: Form<Contextual<'_, SearchInput>>) -> Reply {
    match &form.value {
        Some(input) => Reply::Moved(Redirect::to(format!(
            "/results/{}/{}",
            input.country,
            format_device_list(&input.devices)
        ))),
        None => Reply::flash(HOME, "Enter a country code or ALL and pick at least one device"),
    }
}

#[get("/results/<country>/<devices>")]
pub async fn results(
    db: Db,
    flash: Option<FlashMessage<'_>>,
    country: &str,
    devices: &str,
) -> Reply {
    let flash = flash_view(flash);
    let Some(filter) = CountryFilter::parse(country) else {
        return Reply::flash(HOME, format!("'{}' is not a country code or ALL", country));
    };
    let Some(device_ids) = parse_device_list(devices) else {
        return Reply::flash(HOME, format!("'{}' is not a list of device IDs", devices));
    };

    let query = filter.clone();
    let selected = device_ids.clone();
    let loaded = db
        .run(move |conn| {
            let found = crate::search::search(conn, &query, &selected)?;
            let testers = store::testers_by_id(conn, &found.ordering)?;
            let names = store::device_names(conn)?;
            let all_devices = store::all_devices(conn)?;

            let ranked: Vec<RankedTester> = found
                .ordering
                .iter()
                .filter_map(|id| testers.get(id))
                .enumerate()
                .map(|(i, tester)| {
                    let name = tester.name();
                    RankedTester {
                        rank: i + 1,
                        tester: TesterView::from(tester),
                        total: found.totals[&tester.id],
                        experience: found.experiences[&tester.id]
                            .iter()
                            .map(|exp| {
                                let device = names
                                    .get(&exp.device_id)
                                    .map(String::as_str)
                                    .unwrap_or("");
                                ExperienceView::new(exp, device, &name)
                            })
                            .collect(),
                    }
                })
                .collect();
            Ok((ranked, all_devices))
        })
        .await;

    match loaded {
        Ok((ranked, all_devices)) => Reply::Page(Template::render(
            "results",
            context! {
                title: "Results",
                flash,
                country: filter.to_string(),
                device_options: device_options(&all_devices, &device_ids),
                ranked,
            },
        )),
        Err(e) => Reply::from_error(e, HOME),
    }
}

#[get("/bug/<id>")]
pub async fn bug(db: Db, flash: Option<FlashMessage<'_>>, id: i32) -> Reply {
    let flash = flash_view(flash);
    let loaded = db
        .run(move |conn| {
            let bug = store::find_bug(conn, id).map_err(invalid_id("Bug"))?;
            let device = store::find_device(conn, bug.device_id)?;
            let tester = store::find_tester(conn, bug.tester_id)?;
            let experience = store::experience_for(conn, bug.pair())?
                .map(|e| e.bugs)
                .unwrap_or(0);
            Ok((bug, device, TesterView::from(&tester), experience))
        })
        .await;

    match loaded {
        Ok((bug, device, tester, experience)) => Reply::Page(Template::render(
            "bug",
            context! { title: "Bug Report", flash, bug, device, tester, experience },
        )),
        Err(e) => Reply::from_error(e, HOME),
    }
}

#[get("/device/<id>")]
pub async fn device(db: Db, flash: Option<FlashMessage<'_>>, id: i32) -> Reply {
    let flash = flash_view(flash);
    let loaded = db
        .run(move |conn| {
            let device = store::find_device(conn, id).map_err(invalid_id("Device"))?;
            let testers = store::testers_for_device(conn, id)?;
            let rows = store::experiences_for_device(conn, id, None)?;
            let ids: Vec<i32> = rows.iter().map(|e| e.tester_id).collect();
            let names = store::testers_by_id(conn, &ids)?;
            let experience: Vec<ExperienceView> = rows
                .iter()
                .map(|exp| {
                    let tester = names
                        .get(&exp.tester_id)
                        .map(Tester::name)
                        .unwrap_or_default();
                    ExperienceView::new(exp, &device.device_name, &tester)
                })
                .collect();
            let testers: Vec<TesterView> = testers.iter().map(TesterView::from).collect();
            Ok((device, testers, experience))
        })
        .await;

    match loaded {
        Ok((device, testers, experience)) => Reply::Page(Template::render(
            "device",
            context! { title: "Device Info", flash, device, testers, experience },
        )),
        Err(e) => Reply::from_error(e, HOME),
    }
}

#[get("/tester/<id>")]
pub async fn tester(db: Db, flash: Option<FlashMessage<'_>>, id: i32) -> Reply {
    let flash = flash_view(flash);
    let loaded = db
        .run(move |conn| {
            let tester = store::find_tester(conn, id).map_err(invalid_id("Tester"))?;
            let devices = store::devices_for_tester(conn, id)?;
            let names = store::device_names(conn)?;
            let name = tester.name();
            let experience: Vec<ExperienceView> = store::experiences_for_tester(conn, id)?
                .iter()
                .map(|exp| {
                    let device = names.get(&exp.device_id).map(String::as_str).unwrap_or("");
                    ExperienceView::new(exp, device, &name)
                })
                .collect();
            let total: i64 = experience.iter().map(|e| i64::from(e.bugs)).sum();
            Ok((TesterView::from(&tester), devices, experience, total))
        })
        .await;

    match loaded {
        Ok((tester, devices, experience, total)) => Reply::Page(Template::render(
            "tester",
            context! { title: "Tester Profile", flash, tester, devices, experience, total },
        )),
        Err(e) => Reply::from_error(e, HOME),
    }
}

/// Detail pages word a missing id the same way for every kind.
fn invalid_id(kind: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| match e {
        Error::NotFound(_) => Error::NotFound(format!("{} ID Invalid", kind)),
        other => other,
    }
}
