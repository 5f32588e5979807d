use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Bug, Device, Experience, Tester, LOGIN_FORMAT};

#[derive(Debug, Serialize)]
pub struct TesterView {
    pub id: i32,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub last_login: String,
}

impl From<&Tester> for TesterView {
    fn from(t: &Tester) -> Self {
        Self {
            id: t.id,
            name: t.name(),
            first_name: t.first_name.clone(),
            last_name: t.last_name.clone(),
            country: t.country.clone(),
            last_login: t.last_login.format(LOGIN_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BugView {
    pub id: i32,
    pub device_id: i32,
    pub device: String,
    pub tester_id: i32,
    pub tester: String,
}

impl BugView {
    pub fn new(bug: &Bug, devices: &HashMap<i32, String>, testers: &HashMap<i32, Tester>) -> Self {
        Self {
            id: bug.id,
            device_id: bug.device_id,
            device: devices
                .get(&bug.device_id)
                .cloned()
                .unwrap_or_else(|| "unknown device".into()),
            tester_id: bug.tester_id,
            tester: testers
                .get(&bug.tester_id)
                .map(Tester::name)
                .unwrap_or_else(|| "unknown tester".into()),
        }
    }
}

/// One experience row with the names on both ends resolved.
#[derive(Debug, Serialize)]
pub struct ExperienceView {
    pub device_id: i32,
    pub device: String,
    pub tester_id: i32,
    pub tester: String,
    pub bugs: i32,
}

impl ExperienceView {
    pub fn new(exp: &Experience, device: &str, tester: &str) -> Self {
        Self {
            device_id: exp.device_id,
            device: device.to_string(),
            tester_id: exp.tester_id,
            tester: tester.to_string(),
            bugs: exp.bugs,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceOption {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

pub fn device_options(devices: &[Device], selected: &[i32]) -> Vec<DeviceOption> {
    devices
        .iter()
        .map(|d| DeviceOption {
            id: d.id,
            name: d.device_name.clone(),
            selected: selected.contains(&d.id),
        })
        .collect()
}

/// A ranked tester on the results page.
#[derive(Debug, Serialize)]
pub struct RankedTester {
    pub rank: usize,
    pub tester: TesterView,
    pub total: i64,
    pub experience: Vec<ExperienceView>,
}
