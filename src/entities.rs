//! The entity kinds managed from the developer tools, and their CRUD.

use std::fmt;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::form::FromFormField;
use rocket::request::FromParam;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::forms::{BugInput, DeviceIds, DeviceInput, FieldSpec, NewTesterInput, TesterUpdateInput};
use crate::lifecycle;
use crate::models::{Device, NewDevice, NewTester, Tester, LOGIN_FORMAT};
use crate::schema::{devices, testers};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, FromFormField)]
pub enum EntityKind {
    Bug,
    Device,
    Tester,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Bug, EntityKind::Device, EntityKind::Tester];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Bug => "Bug",
            EntityKind::Device => "Device",
            EntityKind::Tester => "Tester",
        }
    }

    pub fn add_fields(self) -> &'static [FieldSpec] {
        match self {
            EntityKind::Bug => BugHandler::ADD_FIELDS,
            EntityKind::Device => DeviceHandler::ADD_FIELDS,
            EntityKind::Tester => TesterHandler::ADD_FIELDS,
        }
    }

    pub fn edit_fields(self) -> &'static [FieldSpec] {
        match self {
            EntityKind::Bug => BugHandler::EDIT_FIELDS,
            EntityKind::Device => DeviceHandler::EDIT_FIELDS,
            EntityKind::Tester => TesterHandler::EDIT_FIELDS,
        }
    }

    pub fn current_values(self, conn: &mut SqliteConnection, id: i32) -> Result<FieldValues> {
        match self {
            EntityKind::Bug => BugHandler::current_values(conn, id),
            EntityKind::Device => DeviceHandler::current_values(conn, id),
            EntityKind::Tester => TesterHandler::current_values(conn, id),
        }
    }

    /// Fails with not-found when there is nothing to delete.
    pub fn ensure_exists(self, conn: &mut SqliteConnection, id: i32) -> Result<()> {
        match self {
            EntityKind::Bug => store::find_bug(conn, id).map(drop),
            EntityKind::Device => store::find_device(conn, id).map(drop),
            EntityKind::Tester => store::find_tester(conn, id).map(drop),
        }
    }

    pub fn delete(self, conn: &mut SqliteConnection, id: i32) -> Result<()> {
        match self {
            EntityKind::Bug => BugHandler::delete(conn, id),
            EntityKind::Device => DeviceHandler::delete(conn, id),
            EntityKind::Tester => TesterHandler::delete(conn, id),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> FromParam<'a> for EntityKind {
    type Error = &'a str;

    fn from_param(param: &'a str) -> std::result::Result<Self, Self::Error> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == param)
            .ok_or(param)
    }
}

/// Field name and current value, in form order.
pub type FieldValues = Vec<(&'static str, String)>;

/// Add, edit and delete for one kind of entity.
pub trait EntityHandler {
    const KIND: EntityKind;
    const ADD_FIELDS: &'static [FieldSpec];
    const EDIT_FIELDS: &'static [FieldSpec];

    type Create: Send + 'static;
    type Update: Send + 'static;

    /// Field values used to pre-fill the edit form.
    fn current_values(conn: &mut SqliteConnection, id: i32) -> Result<FieldValues>;

    /// Returns the id of the new row.
    fn create(conn: &mut SqliteConnection, input: Self::Create) -> Result<i32>;

    fn update(conn: &mut SqliteConnection, id: i32, input: Self::Update) -> Result<()>;

    fn delete(conn: &mut SqliteConnection, id: i32) -> Result<()>;
}

pub struct BugHandler;

const BUG_FIELDS: &[FieldSpec] = &[
    FieldSpec::number("device_id", "Device ID"),
    FieldSpec::number("tester_id", "Tester ID"),
];

impl EntityHandler for BugHandler {
    const KIND: EntityKind = EntityKind::Bug;
    const ADD_FIELDS: &'static [FieldSpec] = BUG_FIELDS;
    const EDIT_FIELDS: &'static [FieldSpec] = BUG_FIELDS;

    type Create = BugInput;
    type Update = BugInput;

    fn current_values(conn: &mut SqliteConnection, id: i32) -> Result<FieldValues> {
        let bug = store::find_bug(conn, id)?;
        Ok(vec![
            ("device_id", bug.device_id.to_string()),
            ("tester_id", bug.tester_id.to_string()),
        ])
    }

    fn create(conn: &mut SqliteConnection, input: BugInput) -> Result<i32> {
        lifecycle::add_bug(conn, input.pair()).map(|bug| bug.id)
    }

    fn update(conn: &mut SqliteConnection, id: i32, input: BugInput) -> Result<()> {
        lifecycle::edit_bug(conn, id, input.pair()).map(drop)
    }

    fn delete(conn: &mut SqliteConnection, id: i32) -> Result<()> {
        lifecycle::delete_bug(conn, id)
    }
}

pub struct DeviceHandler;

const DEVICE_FIELDS: &[FieldSpec] = &[FieldSpec::text("device_name", "Device Name")];

fn name_taken(name: &str) -> Error {
    Error::Invalid(format!("A device named '{}' already exists", name))
}

impl EntityHandler for DeviceHandler {
    const KIND: EntityKind = EntityKind::Device;
    const ADD_FIELDS: &'static [FieldSpec] = DEVICE_FIELDS;
    const EDIT_FIELDS: &'static [FieldSpec] = DEVICE_FIELDS;

    type Create = DeviceInput;
    type Update = DeviceInput;

    fn current_values(conn: &mut SqliteConnection, id: i32) -> Result<FieldValues> {
        let device = store::find_device(conn, id)?;
        Ok(vec![("device_name", device.device_name)])
    }

    fn create(conn: &mut SqliteConnection, input: DeviceInput) -> Result<i32> {
        let name = input.device_name.0;
        if store::device_name_taken(conn, &name, None)? {
            return Err(name_taken(&name));
        }
        let device = diesel::insert_into(devices::table)
            .values(NewDevice { device_name: &name })
            .returning(Device::as_returning())
            .get_result(conn)?;
        info!(device_id = device.id, name = %device.device_name, "Device added");
        Ok(device.id)
    }

    fn update(conn: &mut SqliteConnection, id: i32, input: DeviceInput) -> Result<()> {
        store::find_device(conn, id)?;
        let name = input.device_name.0;
        if store::device_name_taken(conn, &name, Some(id))? {
            return Err(name_taken(&name));
        }
        diesel::update(devices::table.find(id))
            .set(devices::device_name.eq(&name))
            .execute(conn)?;
        info!(device_id = id, %name, "Device renamed");
        Ok(())
    }

    fn delete(conn: &mut SqliteConnection, id: i32) -> Result<()> {
        store::find_device(conn, id)?;
        diesel::delete(devices::table.find(id))
            .execute(conn)
            .map_err(store::in_use("Device", id))?;
        info!(device_id = id, "Device deleted");
        Ok(())
    }
}

pub struct TesterHandler;

impl EntityHandler for TesterHandler {
    const KIND: EntityKind = EntityKind::Tester;
    const ADD_FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("first_name", "First Name"),
        FieldSpec::text("last_name", "Last Name"),
        FieldSpec::text("country", "Country"),
        FieldSpec::text("last_login", "Last Login Time"),
        FieldSpec::text("devices", "Device IDs, separated by spaces"),
    ];
    const EDIT_FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("first_name", "First Name"),
        FieldSpec::text("last_name", "Last Name"),
        FieldSpec::text("country", "Country"),
        FieldSpec::text("devices", "Device IDs, separated by spaces"),
    ];

    type Create = NewTesterInput;
    type Update = TesterUpdateInput;

    fn current_values(conn: &mut SqliteConnection, id: i32) -> Result<FieldValues> {
        let tester = store::find_tester(conn, id)?;
        let device_ids: Vec<i32> = store::devices_for_tester(conn, id)?
            .into_iter()
            .map(|d| d.id)
            .collect();
        let last_login = tester.last_login.format(LOGIN_FORMAT);
        Ok(vec![
            ("first_name", tester.first_name),
            ("last_name", tester.last_name),
            ("country", tester.country),
            ("last_login", last_login.to_string()),
            ("devices", DeviceIds::to_field_value(&device_ids)),
        ])
    }

    fn create(conn: &mut SqliteConnection, input: NewTesterInput) -> Result<i32> {
        let tester = diesel::insert_into(testers::table)
            .values(NewTester {
                first_name: &input.first_name.0,
                last_name: &input.last_name.0,
                country: &input.country.0,
                last_login: input.last_login.0,
            })
            .returning(Tester::as_returning())
            .get_result(conn)?;
        store::attach_devices(conn, tester.id, &input.devices.0)?;
        info!(tester_id = tester.id, name = %tester.name(), "Tester added");
        Ok(tester.id)
    }

    fn update(conn: &mut SqliteConnection, id: i32, input: TesterUpdateInput) -> Result<()> {
        store::find_tester(conn, id)?;
        diesel::update(testers::table.find(id))
            .set((
                testers::first_name.eq(&input.first_name.0),
                testers::last_name.eq(&input.last_name.0),
                testers::country.eq(&input.country.0),
            ))
            .execute(conn)?;
        let added = store::attach_devices(conn, id, &input.devices.0)?;
        info!(tester_id = id, added, "Tester edited");
        Ok(())
    }

    fn delete(conn: &mut SqliteConnection, id: i32) -> Result<()> {
        store::find_tester(conn, id)?;
        diesel::delete(testers::table.find(id))
            .execute(conn)
            .map_err(store::in_use("Tester", id))?;
        info!(tester_id = id, "Tester deleted");
        Ok(())
    }
}
