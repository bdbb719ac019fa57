use std::ops::Deref;

use entity::{group, preview};
use rocket::{
    form::Form, get, post, response::content::RawHtml, response::Redirect, routes, Responder,
    Route, State,
};
use rocket_dyn_templates::{context, Metadata, Template};
use sea_orm::{DatabaseConnection, PaginatorTrait};
use serde::Serialize;

use super::user::profile_path;
use crate::{
    cache::PageCache,
    config::AppConfig,
    error::Error,
    forms::{CommentForm, FieldErrors, PostForm, TextInput, INVALID_CHOICE, INVALID_IMAGE},
    models::auth::SessionUser,
    pagination::PageWindow,
    permissions, store,
    uploads::{self, ImageUpload, Inspected},
};

const INDEX_DESCRIPTION: &str = "Это главная страница проекта Yatube";
const GROUP_DESCRIPTION: &str = "Информация о группах проекта Yatube";
const POST_DESCRIPTION: &str = "Информация о посте";

pub fn routes() -> Vec<Route> {
    routes![
        index,
        group_posts,
        post_detail,
        post_create_form,
        post_create,
        post_edit_form,
        post_edit,
        add_comment
    ]
}

/// A form page, or where to go once the form was accepted.
#[derive(Responder)]
pub enum FormOutcome {
    Redirect(Redirect),
    Page(Template),
}

#[get("/?<page>")]
async fn index(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    cache: &State<PageCache>,
    metadata: Metadata<'_>,
    viewer: Option<SessionUser>,
    page: Option<&str>,
) -> Result<RawHtml<String>, Error> {
    let count = store::posts().count(db.deref()).await?;
    let number = PageWindow::new(page, count, config.posts_per_page)
        .number
        .to_string();
    let key = format!(
        "index:{}:{number}",
        viewer.as_ref().map_or("", |v| v.username.as_str()),
    );
    if let Some(html) = cache.get(&key) {
        return Ok(RawHtml(html));
    }

    let page_obj = store::card_page(
        db.deref(),
        store::posts(),
        Some(&number),
        config.posts_per_page,
    )
    .await?;
    let (_, html) = metadata
        .render(
            "posts/index",
            context! {
                description: INDEX_DESCRIPTION,
                page_obj,
                viewer: viewer.as_deref(),
            },
        )
        .ok_or(Error::Render("posts/index"))?;

    cache.put(key, html.clone());
    Ok(RawHtml(html))
}

#[get("/group/<slug>?<page>")]
async fn group_posts(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    viewer: Option<SessionUser>,
    slug: &str,
    page: Option<&str>,
) -> Result<Template, Error> {
    let group = store::get_group_by_slug(db.deref(), slug).await?;
    let page_obj = store::card_page(
        db.deref(),
        store::group_posts(group.id),
        page,
        config.posts_per_page,
    )
    .await?;

    Ok(Template::render(
        "posts/group_list",
        context! {
            description: GROUP_DESCRIPTION,
            group,
            page_obj,
            viewer: viewer.as_deref(),
        },
    ))
}

#[get("/posts/<id>")]
async fn post_detail(
    db: &State<DatabaseConnection>,
    viewer: Option<SessionUser>,
    id: i64,
) -> Result<Template, Error> {
    let post = store::get_post(db.deref(), id).await?;
    let total_count = store::count_author_posts(db.deref(), post.author_id).await?;
    let comments = store::comments_for(db.deref(), post.id).await?;
    let is_author = viewer
        .as_deref()
        .map_or(false, |v| permissions::is_author(v, &post));
    let title = preview(&post.text, 30);
    let post = store::cards(db.deref(), vec![post]).await?.pop();

    Ok(Template::render(
        "posts/post_detail",
        context! {
            description: POST_DESCRIPTION,
            title,
            post,
            total_count,
            comments,
            is_author,
            errors: FieldErrors::new(),
            viewer: viewer.as_deref(),
        },
    ))
}

/// Values shown back in the post form.
#[derive(Debug, Default, Serialize)]
struct FormState {
    text: String,
    group: Option<String>,
    image: Option<String>,
}

impl FormState {
    fn submitted(form: &PostForm<'_>, image: Option<String>) -> Self {
        Self {
            text: form.text.clone(),
            group: form.group.clone(),
            image,
        }
    }
}

impl From<&entity::post::Model> for FormState {
    fn from(post: &entity::post::Model) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: post.image.clone(),
        }
    }
}

async fn form_page(
    db: &DatabaseConnection,
    viewer: &SessionUser,
    form: FormState,
    errors: FieldErrors,
    editing: Option<i64>,
) -> Result<Template, Error> {
    let groups: Vec<group::Model> = store::all_groups(db).await?;

    Ok(Template::render(
        "posts/create_post",
        context! {
            form,
            errors,
            groups,
            is_edit: editing.is_some(),
            post_id: editing,
            viewer: &viewer.0,
        },
    ))
}

/// A submitted post form that passed validation.
struct CleanPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

async fn clean_post(
    db: &DatabaseConnection,
    form: &PostForm<'_>,
) -> Result<Result<CleanPost, FieldErrors>, Error> {
    let mut errors = FieldErrors::new();

    if let Err(e) = TextInput::check(&form.text) {
        errors.merge(e);
    }

    let group_id = match form.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        None => None,
        Some(raw) => {
            let known = match raw.parse::<i64>() {
                Ok(id) => store::group_exists(db, id).await?.then_some(id),
                Err(_) => None,
            };
            if known.is_none() {
                errors.add("group", INVALID_CHOICE);
            }
            known
        }
    };

    let image = match &form.image {
        None => None,
        Some(file) => match uploads::inspect(file).await? {
            Inspected::Missing => None,
            Inspected::NotAnImage => {
                errors.add("image", INVALID_IMAGE);
                None
            }
            Inspected::Image(upload) => Some(upload),
        },
    };

    Ok(errors.into_result().map(|()| CleanPost {
        text: form.text.clone(),
        group_id,
        image,
    }))
}

async fn store_image(
    config: &AppConfig,
    image: Option<&ImageUpload>,
) -> Result<Option<String>, Error> {
    match image {
        Some(upload) => Ok(Some(uploads::store(&config.media_root, upload).await?)),
        None => Ok(None),
    }
}

#[get("/create")]
async fn post_create_form(
    db: &State<DatabaseConnection>,
    user: SessionUser,
) -> Result<Template, Error> {
    form_page(db.deref(), &user, FormState::default(), FieldErrors::new(), None).await
}

#[post("/create", data = "<form>")]
async fn post_create(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    user: SessionUser,
    form: Form<PostForm<'_>>,
) -> Result<FormOutcome, Error> {
    let clean = match clean_post(db.deref(), &form).await? {
        Ok(clean) => clean,
        Err(errors) => {
            let state = FormState::submitted(&form, None);
            return Ok(FormOutcome::Page(
                form_page(db.deref(), &user, state, errors, None).await?,
            ));
        }
    };

    let image = store_image(config, clean.image.as_ref()).await?;
    store::create_post(
        db.deref(),
        &user,
        store::NewPost {
            text: clean.text,
            group_id: clean.group_id,
            image,
        },
    )
    .await?;

    Ok(FormOutcome::Redirect(Redirect::to(profile_path(&user.username))))
}

#[get("/posts/<id>/edit")]
async fn post_edit_form(
    db: &State<DatabaseConnection>,
    user: SessionUser,
    id: i64,
) -> Result<FormOutcome, Error> {
    let post = store::get_post(db.deref(), id).await?;
    if !permissions::is_author(&user, &post) {
        return Ok(FormOutcome::Redirect(Redirect::to(format!("/posts/{id}/"))));
    }

    let state = FormState::from(&post);
    Ok(FormOutcome::Page(
        form_page(db.deref(), &user, state, FieldErrors::new(), Some(id)).await?,
    ))
}

#[post("/posts/<id>/edit", data = "<form>")]
async fn post_edit(
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    user: SessionUser,
    id: i64,
    form: Form<PostForm<'_>>,
) -> Result<FormOutcome, Error> {
    let post = store::get_post(db.deref(), id).await?;
    if !permissions::is_author(&user, &post) {
        log::warn!("{} tried to edit post {id} of another author", user.username);
        return Ok(FormOutcome::Redirect(Redirect::to(format!("/posts/{id}/"))));
    }

    let clean = match clean_post(db.deref(), &form).await? {
        Ok(clean) => clean,
        Err(errors) => {
            let state = FormState::submitted(&form, post.image.clone());
            return Ok(FormOutcome::Page(
                form_page(db.deref(), &user, state, errors, Some(id)).await?,
            ));
        }
    };

    // Without a new file the current image stays.
    let image = store_image(config, clean.image.as_ref()).await?.map(Some);
    store::update_post(
        db.deref(),
        post,
        store::PostChanges {
            text: Some(clean.text),
            group_id: Some(clean.group_id),
            image,
        },
    )
    .await?;

    Ok(FormOutcome::Redirect(Redirect::to(format!("/posts/{id}/"))))
}

#[post("/posts/<id>/comment", data = "<form>")]
async fn add_comment(
    db: &State<DatabaseConnection>,
    user: SessionUser,
    id: i64,
    form: Form<CommentForm>,
) -> Result<Redirect, Error> {
    let post = store::get_post(db.deref(), id).await?;

    if TextInput::check(&form.text).is_ok() {
        store::create_comment(db.deref(), &post, &user, form.into_inner().text).await?;
    }

    Ok(Redirect::to(format!("/posts/{id}/")))
}
