//! Bug filing and the experience counters that follow it.
//!
//! For every (tester, device) pair there is at most one experience row, and
//! its `bugs` column tracks how many bugs that tester filed on that device.
//! Adding a bug bumps the counter of its pair; moving a bug to another pair
//! moves one count with it.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Bug, Experience, NewExperience, Pair};
use crate::schema::{bugs, experiences};
use crate::store;

/// File a new bug and credit it to the tester's experience on the device.
pub fn add_bug(conn: &mut SqliteConnection, pair: Pair) -> Result<Bug> {
    ensure_pair_exists(conn, pair)?;

    let bug = diesel::insert_into(bugs::table)
        .values(pair)
        .returning(Bug::as_returning())
        .get_result(conn)?;
    let exp = credit(conn, pair)?;

    info!(bug_id = bug.id, ?pair, experience = exp.bugs, "Bug added");
    Ok(bug)
}

/// Reassign a bug to another device and/or tester.
pub fn edit_bug(conn: &mut SqliteConnection, bug_id: i32, pair: Pair) -> Result<Bug> {
    let bug = store::find_bug(conn, bug_id)?;
    let old = bug.pair();
    if old == pair {
        return Err(Error::Invalid("Please change some parameters".into()));
    }
    ensure_pair_exists(conn, pair)?;

    debit(conn, old)?;
    credit(conn, pair)?;

    let bug = diesel::update(bugs::table.find(bug_id))
        .set((
            bugs::device_id.eq(pair.device_id),
            bugs::tester_id.eq(pair.tester_id),
        ))
        .returning(Bug::as_returning())
        .get_result(conn)?;

    info!(bug_id, from = ?old, to = ?pair, "Bug edited");
    Ok(bug)
}

/// Remove a bug. The experience counter of its pair is left as it was.
pub fn delete_bug(conn: &mut SqliteConnection, bug_id: i32) -> Result<()> {
    let bug = store::find_bug(conn, bug_id)?;
    diesel::delete(bugs::table.find(bug_id)).execute(conn)?;
    debug!(bug_id, pair = ?bug.pair(), "Experience counter not adjusted on bug delete");
    info!(bug_id, "Bug deleted");
    Ok(())
}

fn ensure_pair_exists(conn: &mut SqliteConnection, pair: Pair) -> Result<()> {
    store::find_device(conn, pair.device_id)?;
    store::find_tester(conn, pair.tester_id)?;
    Ok(())
}

/// Find-or-create the experience row for `pair` and add one bug to it.
fn credit(conn: &mut SqliteConnection, pair: Pair) -> Result<Experience> {
    match store::experience_for(conn, pair)? {
        Some(exp) => Ok(diesel::update(experiences::table.find(exp.id))
            .set(experiences::bugs.eq(experiences::bugs + 1))
            .returning(Experience::as_returning())
            .get_result(conn)?),
        None => Ok(diesel::insert_into(experiences::table)
            .values(NewExperience {
                device_id: pair.device_id,
                tester_id: pair.tester_id,
                bugs: 1,
            })
            .returning(Experience::as_returning())
            .get_result(conn)?),
    }
}

fn debit(conn: &mut SqliteConnection, pair: Pair) -> Result<Experience> {
    let exp = store::experience_for(conn, pair)?.ok_or_else(|| {
        Error::NotFound(format!(
            "No experience recorded for tester {} on device {}",
            pair.tester_id, pair.device_id
        ))
    })?;
    Ok(diesel::update(experiences::table.find(exp.id))
        .set(experiences::bugs.eq(experiences::bugs - 1))
        .returning(Experience::as_returning())
        .get_result(conn)?)
}
