//! Developer tools: add, edit and delete for every entity kind.

use rocket::form::{Context, Contextual, Form};
use rocket::http::Status;
use rocket::request::FlashMessage;
use rocket::response::Redirect;
use rocket::{get, post};
use rocket_dyn_templates::{context, Template};

use super::{flash_view, FlashView, Reply, DEVTOOLS};
use crate::db::Db;
use crate::entities::{BugHandler, DeviceHandler, EntityHandler, EntityKind, TesterHandler};
use crate::error::Error;
use crate::forms::{
    BugInput, ConfirmInput, DevToolsInput, DeviceInput, FormView, NewTesterInput,
    TesterUpdateInput, Tool,
};

type Kind<'a> = Result<EntityKind, &'a str>;

fn unknown_kind(kind: &str) -> Reply {
    tracing::warn!(kind, "Unrecognized object type");
    Reply::flash(DEVTOOLS, "Object type not recognized")
}

fn render_form(view: FormView, flash: Option<FlashView>) -> Template {
    Template::render("form", context! { title: view.title.clone(), flash, form: view })
}

/// Split a submitted form into its value, or the page to show instead.
fn accept<T>(
    form: Contextual<'_, T>,
    view: impl FnOnce(&Context<'_>) -> FormView,
) -> Result<T, Reply> {
    if let Some(value) = form.value {
        return Ok(value);
    }

    let view = view(&form.context);
    // Errors on fields the form does not render would otherwise be invisible.
    let flash = (!view.has_errors()).then(|| FlashView {
        kind: "error".into(),
        message: "The form could not be read, please fill it in again.".into(),
    });
    let page = render_form(view, flash);
    Err(Reply::Rejected((Status::UnprocessableEntity, page)))
}

#[get("/devtools")]
pub fn devtools(flash: Option<FlashMessage<'_>>) -> Template {
    Template::render(
        "devtools",
        context! {
            title: "Devtools",
            flash: flash_view(flash),
            kinds: EntityKind::ALL,
        },
    )
}

#[post("/devtools", data = "<form>")]
pub fn choose_tool(form: Form<Contextual<'_, DevToolsInput>>) -> Reply {
    let Some(input) = &form.value else {
        return Reply::flash(DEVTOOLS, "Unrecognized tool or object type");
    };

    let kind = input.obj_type;
    let action = match input.tool {
        Tool::Add => return Reply::Moved(Redirect::to(format!("/add/{}", kind))),
        Tool::Edit => "edit",
        Tool::Delete => "delete",
    };
    match input.obj_id {
        Some(id) if id > 0 => Reply::Moved(Redirect::to(format!("/{}/{}/{}", action, kind, id))),
        _ => Reply::flash(DEVTOOLS, "Please choose a valid ID"),
    }
}

#[get("/add/<kind>")]
pub fn add_page(kind: Kind<'_>, flash: Option<FlashMessage<'_>>) -> Reply {
    match kind {
        Ok(kind) => {
            let title = format!("Add {}", kind);
            let action = format!("/add/{}", kind);
            let view = FormView::new(title, action, kind.add_fields(), &[]);
            Reply::Page(render_form(view, flash_view(flash)))
        }
        Err(kind) => unknown_kind(kind),
    }
}

#[post("/add/Bug", data = "<form>")]
pub async fn add_bug(db: Db, form: Form<Contextual<'_, BugInput>>) -> Reply {
    submit_add::<BugHandler>(db, form.into_inner()).await
}

#[post("/add/Device", data = "<form>")]
pub async fn add_device(db: Db, form: Form<Contextual<'_, DeviceInput>>) -> Reply {
    submit_add::<DeviceHandler>(db, form.into_inner()).await
}

#[post("/add/Tester", data = "<form>")]
pub async fn add_tester(db: Db, form: Form<Contextual<'_, NewTesterInput>>) -> Reply {
    submit_add::<TesterHandler>(db, form.into_inner()).await
}

#[post("/add/<kind>", rank = 2)]
pub fn add_unknown(kind: &str) -> Reply {
    unknown_kind(kind)
}

async fn submit_add<H: EntityHandler>(db: Db, form: Contextual<'_, H::Create>) -> Reply {
    let kind = H::KIND;
    let path = format!("/add/{}", kind);
    let input = match accept(form, |ctx| {
        FormView::from_context(format!("Add {}", kind), path.clone(), H::ADD_FIELDS, ctx)
    }) {
        Ok(input) => input,
        Err(reply) => return reply,
    };

    match db.run(move |conn| H::create(conn, input)).await {
        Ok(id) => {
            tracing::info!(%kind, id, "Added from devtools");
            Reply::success(DEVTOOLS, format!("{} added successfully", kind))
        }
        Err(e) => Reply::from_error(e, path),
    }
}

#[get("/edit/<kind>/<id>")]
pub async fn edit_page(db: Db, kind: Kind<'_>, id: i32, flash: Option<FlashMessage<'_>>) -> Reply {
    let kind = match kind {
        Ok(kind) => kind,
        Err(kind) => return unknown_kind(kind),
    };
    let flash = flash_view(flash);

    match db.run(move |conn| kind.current_values(conn, id)).await {
        Ok(values) => Reply::Page(render_form(
            FormView::new(
                format!("Edit {}", kind),
                format!("/edit/{}/{}", kind, id),
                kind.edit_fields(),
                &values,
            ),
            flash,
        )),
        Err(e) => Reply::from_error(e, DEVTOOLS),
    }
}

#[post("/edit/Bug/<id>", data = "<form>")]
pub async fn edit_bug(db: Db, id: i32, form: Form<Contextual<'_, BugInput>>) -> Reply {
    submit_edit::<BugHandler>(db, id, form.into_inner()).await
}

#[post("/edit/Device/<id>", data = "<form>")]
pub async fn edit_device(db: Db, id: i32, form: Form<Contextual<'_, DeviceInput>>) -> Reply {
    let form = form.into_inner();
    submit_edit::<DeviceHandler>(db, id, form).await
}

#[post("/edit/Tester/<id>", data = "<form>")]
pub async fn edit_tester(
    db: Db,
    id: i32,
    form: Form<Contextual<'_, TesterUpdateInput>>,
) -> Reply {
    let form = form.into_inner();
    submit_edit::<TesterHandler>(db, id, form).await
}

#[post("/edit/<kind>/<_>", rank = 2)]
pub fn edit_unknown(kind: &str) -> Reply {
    unknown_kind(kind)
}

async fn submit_edit<H: EntityHandler>(db: Db, id: i32, form: Contextual<'_, H::Update>) -> Reply {
    let kind = H::KIND;
    let path = format!("/edit/{}/{}", kind, id);
    let input = match accept(form, |ctx| {
        FormView::from_context(format!("Edit {}", kind), path.clone(), H::EDIT_FIELDS, ctx)
    }) {
        Ok(input) => input,
        Err(reply) => return reply,
    };

    match db.run(move |conn| H::update(conn, id, input)).await {
        Ok(()) => Reply::success(DEVTOOLS, format!("{} edited successfully", kind)),
        // A missing row has no edit page to go back to.
        Err(e @ Error::NotFound(_)) => Reply::from_error(e, DEVTOOLS),
        Err(e) => Reply::from_error(e, path),
    }
}

#[get("/delete/<kind>/<id>")]
pub async fn delete_page(db: Db, kind: Kind<'_>, id: i32) -> Reply {
    let kind = match kind {
        Ok(kind) => kind,
        Err(kind) => return unknown_kind(kind),
    };

    match db.run(move |conn| kind.ensure_exists(conn, id)).await {
        Ok(()) => Reply::Page(Template::render(
            "delete",
            context! {
                title: format!("Delete {}", kind),
                kind,
                id,
                action: format!("/delete/{}/{}", kind, id),
            },
        )),
        Err(e) => Reply::from_error(e, DEVTOOLS),
    }
}

#[post("/delete/<kind>/<id>", data = "<form>")]
pub async fn delete(db: Db, kind: Kind<'_>, id: i32, form: Form<ConfirmInput>) -> Reply {
    let kind = match kind {
        Ok(kind) => kind,
        Err(kind) => return unknown_kind(kind),
    };
    if !form.are_you_sure {
        return Reply::flash(DEVTOOLS, format!("{} {} was not deleted", kind, id));
    }

    match db.run(move |conn| kind.delete(conn, id)).await {
        Ok(()) => Reply::success(DEVTOOLS, format!("{} deleted successfully", kind)),
        Err(e) => Reply::from_error(e, DEVTOOLS),
    }
}
