//! Form inputs and the field descriptions used to render them.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use rocket::form::{self, Context, FromForm, FromFormField, ValueField};
use serde::Serialize;

use crate::entities::EntityKind;
use crate::models::{Pair, LOGIN_FORMAT};
use crate::search::{country_code, CountryFilter};

pub const MAX_NAME_LEN: usize = 64;

fn invalid<'v>(message: impl Into<Cow<'v, str>>) -> form::Errors<'v> {
    form::Error::validation(message).into()
}

/// Trimmed, non-blank text of at most [`MAX_NAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Name(pub String);

impl<'v> FromFormField<'v> for Name {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        let value = field.value.trim();
        if value.is_empty() {
            return Err(invalid("This field is required."));
        }
        if value.chars().count() > MAX_NAME_LEN {
            return Err(invalid(format!("At most {} characters.", MAX_NAME_LEN)));
        }
        Ok(Name(value.to_string()))
    }
}

/// Two letter country code, stored uppercase.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryCode(pub String);

impl<'v> FromFormField<'v> for CountryCode {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        country_code(field.value)
            .map(CountryCode)
            .ok_or_else(|| invalid("Use a two letter country code."))
    }
}

impl<'v> FromFormField<'v> for CountryFilter {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        CountryFilter::parse(field.value)
            .ok_or_else(|| invalid("Use a two letter country code or ALL."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoginTime(pub NaiveDateTime);

impl<'v> FromFormField<'v> for LoginTime {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        NaiveDateTime::parse_from_str(field.value.trim(), LOGIN_FORMAT)
            .map(LoginTime)
            .map_err(|_| invalid("Expected YYYY-MM-DD HH:MM:SS."))
    }
}

/// Space separated device ids, e.g. `1 4 7`. At least one is required.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIds(pub Vec<i32>);

impl<'v> FromFormField<'v> for DeviceIds {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        let mut ids = Vec::new();
        for part in field.value.split_whitespace() {
            let id = part
                .parse::<i32>()
                .map_err(|_| invalid(format!("'{}' is not a device ID.", part)))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(invalid("This field is required."));
        }
        Ok(DeviceIds(ids))
    }
}

impl DeviceIds {
    pub fn to_field_value(ids: &[i32]) -> String {
        ids.iter().map(i32::to_string).collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, FromForm)]
pub struct BugInput {
    #[field(validate = range(1..))]
    pub device_id: i32,
    #[field(validate = range(1..))]
    pub tester_id: i32,
}

impl BugInput {
    pub fn pair(&self) -> Pair {
        Pair::new(self.device_id, self.tester_id)
    }
}

#[derive(Debug, FromForm)]
pub struct DeviceInput {
    pub device_name: Name,
}

#[derive(Debug, FromForm)]
pub struct NewTesterInput {
    pub first_name: Name,
    pub last_name: Name,
    pub country: CountryCode,
    pub last_login: LoginTime,
    pub devices: DeviceIds,
}

#[derive(Debug, FromForm)]
pub struct TesterUpdateInput {
    pub first_name: Name,
    pub last_name: Name,
    pub country: CountryCode,
    pub devices: DeviceIds,
}

#[derive(Debug, FromForm)]
pub struct ConfirmInput {
    pub are_you_sure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum Tool {
    Add,
    Edit,
    Delete,
}

#[derive(Debug, FromForm)]
pub struct DevToolsInput {
    pub tool: Tool,
    pub obj_type: EntityKind,
    /// Blank or malformed ids come through as `None`.
    pub obj_id: Option<i32>,
}

#[derive(Debug, FromForm)]
pub struct SearchInput {
    pub country: CountryFilter,
    #[field(validate = len(1..))]
    pub devices: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
}

/// Static description of one form input.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: InputKind,
}

impl FieldSpec {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: InputKind::Text,
        }
    }

    pub const fn number(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: InputKind::Number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: InputKind,
    pub value: String,
    pub errors: Vec<String>,
}

/// Everything the generic form template needs.
#[derive(Debug, Serialize)]
pub struct FormView {
    pub title: String,
    pub action: String,
    pub fields: Vec<FieldView>,
}

impl FormView {
    /// Empty form, or pre-filled from `values` (field name, value).
    pub fn new(
        title: String,
        action: String,
        specs: &[FieldSpec],
        values: &[(&str, String)],
    ) -> Self {
        let fields = specs
            .iter()
            .map(|spec| FieldView {
                name: spec.name,
                label: spec.label,
                kind: spec.kind,
                value: values
                    .iter()
                    .find(|(name, _)| *name == spec.name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default(),
                errors: Vec::new(),
            })
            .collect();
        Self {
            title,
            action,
            fields,
        }
    }

    /// Re-render a rejected submission: what the user typed plus the errors.
    pub fn from_context(
        title: String,
        action: String,
        specs: &[FieldSpec],
        context: &Context<'_>,
    ) -> Self {
        let fields = specs
            .iter()
            .map(|spec| FieldView {
                name: spec.name,
                label: spec.label,
                kind: spec.kind,
                value: context
                    .field_value(spec.name)
                    .unwrap_or_default()
                    .to_string(),
                errors: context
                    .field_errors(spec.name)
                    .map(|e| e.to_string())
                    .collect(),
            })
            .collect();
        Self {
            title,
            action,
            fields,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|f| !f.errors.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::form::{Contextual, Form};

    #[test]
    fn tester_form_parses_all_fields() {
        // `Form::parse` takes text that is already percent-decoded.
        let input: NewTesterInput = Form::parse(concat!(
            "first_name=Taybin&last_name=Rutkin&country=us",
            "&last_login=2013-08-04 23:57:38&devices=1 4 4",
        ))
        .unwrap();

        assert_eq!(input.first_name, Name("Taybin".into()));
        assert_eq!(input.country, CountryCode("US".into()));
        assert_eq!(input.last_login.0.to_string(), "2013-08-04 23:57:38");
        assert_eq!(input.devices, DeviceIds(vec![1, 4]));
    }

    #[test]
    fn tester_form_rejects_bad_values() {
        let result = Form::<NewTesterInput>::parse(
            "first_name= &last_name=Rutkin&country=USA&last_login=yesterday&devices=1 x",
        );
        let errors = result.unwrap_err();
        let failed: Vec<String> = errors
            .iter()
            .filter_map(|e| e.name.as_ref().map(|n| n.to_string()))
            .collect();
        for field in ["first_name", "country", "last_login", "devices"] {
            assert!(
                failed.iter().any(|f| f == field),
                "{} should fail, got {:?}",
                field,
                failed
            );
        }
    }

    #[test]
    fn bug_ids_must_be_positive() {
        assert!(Form::<BugInput>::parse("device_id=0&tester_id=2").is_err());
        let input: BugInput = Form::parse("device_id=3&tester_id=2").unwrap();
        assert_eq!(input.pair(), Pair::new(3, 2));
    }

    #[test]
    fn devtools_id_is_optional() {
        let input: DevToolsInput = Form::parse("tool=edit&obj_type=Tester&obj_id=").unwrap();
        assert_eq!(input.tool, Tool::Edit);
        assert_eq!(input.obj_type, EntityKind::Tester);
        assert_eq!(input.obj_id, None);
    }

    #[test]
    fn search_needs_a_device() {
        assert!(Form::<SearchInput>::parse("country=ALL").is_err());
        let input: SearchInput = Form::parse("country=gb&devices=2&devices=5").unwrap();
        assert_eq!(input.country, CountryFilter::Code("GB".into()));
        assert_eq!(input.devices, vec![2, 5]);
    }

    #[test]
    fn form_view_prefills_known_fields() {
        let specs = [FieldSpec::text("device_name", "Device Name")];
        let values = [("device_name", "iPhone 4".to_string())];
        let view = FormView::new(
            "Edit Device".into(),
            "/edit/Device/1".into(),
            &specs,
            &values,
        );
        assert_eq!(view.fields[0].value, "iPhone 4");
        assert!(!view.has_errors());
    }

    #[test]
    fn rejected_submission_keeps_errors_per_field() {
        let form: Contextual<'_, DeviceInput> = Form::parse("device_name= ").unwrap();
        assert!(form.value.is_none());

        let specs = [FieldSpec::text("device_name", "Device Name")];
        let view = FormView::from_context(
            "Add Device".into(),
            "/add/Device".into(),
            &specs,
            &form.context,
        );
        assert!(view.has_errors());
        assert_eq!(view.fields[0].errors, ["This field is required."]);
    }
}
