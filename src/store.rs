//! Lookups shared by the lifecycle, search and CRUD code.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Bug, Device, Experience, Pair, Tester, TesterDevice};
use crate::schema::{bugs, devices, experiences, tester_devices, testers};

pub fn find_device(conn: &mut SqliteConnection, id: i32) -> Result<Device> {
    devices::table
        .find(id)
        .select(Device::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("Device", id))
}

pub fn find_tester(conn: &mut SqliteConnection, id: i32) -> Result<Tester> {
    testers::table
        .find(id)
        .select(Tester::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("Tester", id))
}

pub fn find_bug(conn: &mut SqliteConnection, id: i32) -> Result<Bug> {
    bugs::table
        .find(id)
        .select(Bug::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("Bug", id))
}

pub fn all_devices(conn: &mut SqliteConnection) -> QueryResult<Vec<Device>> {
    devices::table
        .order(devices::id)
        .select(Device::as_select())
        .load(conn)
}

pub fn all_testers(conn: &mut SqliteConnection) -> QueryResult<Vec<Tester>> {
    testers::table
        .order(testers::id)
        .select(Tester::as_select())
        .load(conn)
}

pub fn all_bugs(conn: &mut SqliteConnection) -> QueryResult<Vec<Bug>> {
    bugs::table
        .order(bugs::id)
        .select(Bug::as_select())
        .load(conn)
}

pub fn testers_by_id(
    conn: &mut SqliteConnection,
    ids: &[i32],
) -> QueryResult<HashMap<i32, Tester>> {
    let rows = testers::table
        .filter(testers::id.eq_any(ids))
        .select(Tester::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(|t| (t.id, t)).collect())
}

pub fn device_names(conn: &mut SqliteConnection) -> QueryResult<HashMap<i32, String>> {
    let rows = devices::table
        .select((devices::id, devices::device_name))
        .load::<(i32, String)>(conn)?;
    Ok(rows.into_iter().collect())
}

pub fn device_name_taken(
    conn: &mut SqliteConnection,
    name: &str,
    except: Option<i32>,
) -> QueryResult<bool> {
    let same_name = devices::table.filter(devices::device_name.eq(name));
    let count: i64 = match except {
        Some(id) => same_name
            .filter(devices::id.ne(id))
            .count()
            .get_result(conn)?,
        None => same_name.count().get_result(conn)?,
    };
    Ok(count > 0)
}

pub fn devices_for_tester(conn: &mut SqliteConnection, tester_id: i32) -> QueryResult<Vec<Device>> {
    tester_devices::table
        .inner_join(devices::table)
        .filter(tester_devices::tester_id.eq(tester_id))
        .order(devices::id)
        .select(Device::as_select())
        .load(conn)
}

pub fn testers_for_device(conn: &mut SqliteConnection, device_id: i32) -> QueryResult<Vec<Tester>> {
    tester_devices::table
        .inner_join(testers::table)
        .filter(tester_devices::device_id.eq(device_id))
        .order(testers::id)
        .select(Tester::as_select())
        .load(conn)
}

/// Link devices to a tester. Links that already exist are left alone, so
/// this only ever grows the association. Returns the number of new links.
pub fn attach_devices(
    conn: &mut SqliteConnection,
    tester_id: i32,
    device_ids: &[i32],
) -> Result<usize> {
    let mut added = 0;
    for &device_id in device_ids {
        find_device(conn, device_id)?;
        added += diesel::insert_or_ignore_into(tester_devices::table)
            .values(TesterDevice {
                tester_id,
                device_id,
            })
            .execute(conn)?;
    }
    debug!(tester_id, added, "Attached devices");
    Ok(added)
}

pub fn experience_for(conn: &mut SqliteConnection, pair: Pair) -> QueryResult<Option<Experience>> {
    experiences::table
        .filter(experiences::device_id.eq(pair.device_id))
        .filter(experiences::tester_id.eq(pair.tester_id))
        .select(Experience::as_select())
        .first(conn)
        .optional()
}

pub fn experiences_for_tester(
    conn: &mut SqliteConnection,
    tester_id: i32,
) -> QueryResult<Vec<Experience>> {
    experiences::table
        .filter(experiences::tester_id.eq(tester_id))
        .order(experiences::device_id)
        .select(Experience::as_select())
        .load(conn)
}

/// Experience rows on one device, optionally limited to testers from one
/// country.
pub fn experiences_for_device(
    conn: &mut SqliteConnection,
    device_id: i32,
    country: Option<&str>,
) -> QueryResult<Vec<Experience>> {
    let mut query = experiences::table
        .inner_join(testers::table)
        .filter(experiences::device_id.eq(device_id))
        .select(Experience::as_select())
        .order(experiences::id)
        .into_boxed();
    if let Some(code) = country {
        query = query.filter(testers::country.eq(code));
    }
    query.load(conn)
}

/// Turn a foreign key failure on delete into a message for the user.
pub fn in_use(kind: &'static str, id: i32) -> impl FnOnce(DieselError) -> Error {
    move |e| match e {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            Error::InUse(format!(
                "{} {} still has bugs or experience on record and cannot be deleted",
                kind, id
            ))
        }
        other => other.into(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn missing_rows_are_reported_by_kind() {
        let mut conn = test_connection();
        let err = find_device(&mut conn, 3).unwrap_err();
        assert_eq!(err.to_string(), "No Device with ID 3");
        let err = find_tester(&mut conn, 4).unwrap_err();
        assert_eq!(err.to_string(), "No Tester with ID 4");
        let err = find_bug(&mut conn, 5).unwrap_err();
        assert_eq!(err.to_string(), "No Bug with ID 5");
    }

    #[test]
    fn association_is_indexed_both_ways() {
        let mut conn = test_connection();
        let iphone = fixtures::device(&mut conn, "iPhone 4");
        let galaxy = fixtures::device(&mut conn, "Galaxy S3");
        let ann = fixtures::tester(&mut conn, "Ann", "US");
        let bob = fixtures::tester(&mut conn, "Bob", "GB");

        let both = [iphone.id, galaxy.id];
        attach_devices(&mut conn, ann.id, &both).unwrap();
        attach_devices(&mut conn, bob.id, &[galaxy.id]).unwrap();

        let ann_devices = devices_for_tester(&mut conn, ann.id).unwrap();
        assert_eq!(ann_devices, vec![iphone.clone(), galaxy.clone()]);

        let galaxy_testers = testers_for_device(&mut conn, galaxy.id).unwrap();
        assert_eq!(galaxy_testers, vec![ann, bob]);
    }

    #[test]
    fn attaching_is_additive_and_idempotent() {
        let mut conn = test_connection();
        let iphone = fixtures::device(&mut conn, "iPhone 4");
        let galaxy = fixtures::device(&mut conn, "Galaxy S3");
        let ann = fixtures::tester(&mut conn, "Ann", "US");

        assert_eq!(attach_devices(&mut conn, ann.id, &[iphone.id]).unwrap(), 1);
        let both = [iphone.id, galaxy.id];
        assert_eq!(attach_devices(&mut conn, ann.id, &both).unwrap(), 1);
        assert_eq!(devices_for_tester(&mut conn, ann.id).unwrap().len(), 2);
    }

    #[test]
    fn attaching_unknown_device_fails() {
        let mut conn = test_connection();
        let ann = fixtures::tester(&mut conn, "Ann", "US");
        let err = attach_devices(&mut conn, ann.id, &[42]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn device_name_uniqueness_check_skips_self() {
        let mut conn = test_connection();
        let iphone = fixtures::device(&mut conn, "iPhone 4");
        assert!(device_name_taken(&mut conn, "iPhone 4", None).unwrap());
        let own_id = Some(iphone.id);
        assert!(!device_name_taken(&mut conn, "iPhone 4", own_id).unwrap());
        assert!(!device_name_taken(&mut conn, "Nexus 4", None).unwrap());
    }
}
