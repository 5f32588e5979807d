use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{bugs, devices, experiences, tester_devices, testers};

/// Format used for `last_login` in forms and pages.
pub const LOGIN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = devices)]
pub struct Device {
    pub id: i32,
    pub device_name: String,
}

#[derive(Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice<'a> {
    pub device_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = testers)]
pub struct Tester {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub last_login: NaiveDateTime,
}

impl Tester {
    pub fn name(&self) -> String {
        format!("{} {} ({})", self.first_name, self.last_name, self.country)
    }
}

#[derive(Insertable)]
#[diesel(table_name = testers)]
pub struct NewTester<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub country: &'a str,
    pub last_login: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = bugs)]
pub struct Bug {
    pub id: i32,
    pub device_id: i32,
    pub tester_id: i32,
}

impl Bug {
    pub fn pair(&self) -> Pair {
        Pair::new(self.device_id, self.tester_id)
    }
}

/// A (device, tester) combination. Bugs and experience are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Insertable)]
#[diesel(table_name = bugs)]
pub struct Pair {
    pub device_id: i32,
    pub tester_id: i32,
}

impl Pair {
    pub fn new(device_id: i32, tester_id: i32) -> Self {
        Self {
            device_id,
            tester_id,
        }
    }
}

/// Number of bugs one tester has filed against one device.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = experiences)]
pub struct Experience {
    pub id: i32,
    pub device_id: i32,
    pub tester_id: i32,
    pub bugs: i32,
}

#[derive(Insertable)]
#[diesel(table_name = experiences)]
pub struct NewExperience {
    pub device_id: i32,
    pub tester_id: i32,
    pub bugs: i32,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = tester_devices)]
pub struct TesterDevice {
    pub tester_id: i32,
    pub device_id: i32,
}
