mod common;

use common::*;
use entity::{comment, follow, post};
use pretty_assertions::assert_eq;
use rocket::http::{ContentType, Status};
use sea_orm::{EntityTrait, PaginatorTrait};
use yatube::{
    cache::PageCache,
    forms::{BLANK, INVALID_CHOICE, INVALID_IMAGE},
    store,
};

fn cards_in(body: &str) -> usize {
    body.matches("подробная информация").count()
}

#[rocket::async_test]
async fn creating_a_post_with_an_image_redirects_to_the_profile() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;
    let before = post_count(&app.db).await;

    let (content_type, body) = multipart(&[("text", "Текст из формы")], Some(("small.jpg", JPEG)));
    let response = session(app.client.post("/create/"), &author)
        .header(content_type)
        .body(body)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some("/profile/leo/"));
    assert_eq!(post_count(&app.db).await, before + 1);

    let post = post::Entity::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(post.text, "Текст из формы");
    assert_eq!(post.author_id, author.id);
    assert_eq!(post.image.as_deref(), Some("posts/small.jpg"));
    assert!(app.media.join("posts/small.jpg").is_file());
}

#[rocket::async_test]
async fn a_text_file_is_not_accepted_as_image() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;

    let (content_type, body) = multipart(&[("text", "Текст")], Some(("notes.txt", b"just text")));
    let response = session(app.client.post("/create/"), &author)
        .header(content_type)
        .body(body)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert!(response.into_string().await.unwrap().contains(INVALID_IMAGE));
    assert_eq!(post_count(&app.db).await, 0);
}

#[rocket::async_test]
async fn invalid_fields_rerender_the_form() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;

    let response = session(app.client.post("/create/"), &author)
        .header(ContentType::Form)
        .body("text=%20%20&group=999")
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().await.unwrap();
    assert!(body.contains(BLANK));
    assert!(body.contains(INVALID_CHOICE));
    assert_eq!(post_count(&app.db).await, 0);
}

#[rocket::async_test]
async fn anonymous_visitors_are_sent_to_login() {
    let app = app().await;

    let response = app.client.get("/create/").dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);
    assert!(location(&response)
        .unwrap()
        .starts_with("/auth/login/?next="));

    let response = app.client.get("/follow/").dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);
}

#[rocket::async_test]
async fn only_the_author_can_edit() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;
    let other = create_user(&app.db, "fyodor").await;
    let post = create_post(&app.db, &author, "Исходный текст", None).await;
    let url = format!("/posts/{}/edit/", post.id);

    let response = session(app.client.post(url.as_str()), &other)
        .header(ContentType::Form)
        .body("text=Чужая%20правка")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), Some(format!("/posts/{}/", post.id)));
    let unchanged = store::get_post(&app.db, post.id).await.unwrap();
    assert_eq!(unchanged.text, "Исходный текст");

    let response = session(app.client.get(url.as_str()), &other).dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);

    let group = create_group(&app.db, "cats").await;
    let response = session(app.client.post(url.as_str()), &author)
        .header(ContentType::Form)
        .body(format!("text=Новый%20текст&group={}", group.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    let edited = store::get_post(&app.db, post.id).await.unwrap();
    assert_eq!(edited.text, "Новый текст");
    assert_eq!(edited.group_id, Some(group.id));
    assert_eq!(edited.pub_date, post.pub_date);
}

#[rocket::async_test]
async fn listings_are_paginated() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;
    let group = create_group(&app.db, "cats").await;
    for i in 0..13 {
        create_post(&app.db, &author, &format!("Пост {i}"), Some(group.id)).await;
    }

    for base in ["/", "/group/cats/", "/profile/leo/"] {
        let first = app.client.get(base).dispatch().await;
        assert_eq!(cards_in(&first.into_string().await.unwrap()), 10, "{base}");

        let second = app.client.get(format!("{base}?page=2")).dispatch().await;
        assert_eq!(cards_in(&second.into_string().await.unwrap()), 3, "{base}");

        let clamped = app.client.get(format!("{base}?page=40")).dispatch().await;
        assert_eq!(cards_in(&clamped.into_string().await.unwrap()), 3, "{base}");
    }
}

#[rocket::async_test]
async fn group_page_lists_only_its_posts() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;
    let cats = create_group(&app.db, "cats").await;
    create_group(&app.db, "dogs").await;
    create_post(&app.db, &author, "Про котов", Some(cats.id)).await;

    let body = app.client.get("/group/dogs/").dispatch().await.into_string().await.unwrap();
    assert!(!body.contains("Про котов"));

    let body = app.client.get("/group/cats/").dispatch().await.into_string().await.unwrap();
    assert!(body.contains("Про котов"));

    let missing = app.client.get("/group/birds/").dispatch().await;
    assert_eq!(missing.status(), Status::NotFound);
}

#[rocket::async_test]
async fn unknown_objects_are_not_found() {
    let app = app().await;

    assert_eq!(app.client.get("/posts/42/").dispatch().await.status(), Status::NotFound);
    assert_eq!(app.client.get("/profile/nobody/").dispatch().await.status(), Status::NotFound);
}

#[rocket::async_test]
async fn following_twice_keeps_one_subscription() {
    let app = app().await;
    let reader = create_user(&app.db, "reader").await;
    create_user(&app.db, "leo").await;

    for _ in 0..2 {
        let response = session(app.client.get("/profile/leo/follow/"), &reader)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(location(&response).as_deref(), Some("/profile/leo/"));
    }
    assert_eq!(follow::Entity::find().count(&app.db).await.unwrap(), 1);

    session(app.client.get("/profile/reader/follow/"), &reader)
        .dispatch()
        .await;
    assert_eq!(follow::Entity::find().count(&app.db).await.unwrap(), 1);

    session(app.client.get("/profile/leo/unfollow/"), &reader)
        .dispatch()
        .await;
    assert_eq!(follow::Entity::find().count(&app.db).await.unwrap(), 0);
}

#[rocket::async_test]
async fn feed_shows_posts_of_followed_authors_only() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;
    let follower = create_user(&app.db, "reader").await;
    let stranger = create_user(&app.db, "stranger").await;

    session(app.client.get("/profile/leo/follow/"), &follower)
        .dispatch()
        .await;
    create_post(&app.db, &author, "Новая глава", None).await;

    let feed = session(app.client.get("/follow/"), &follower)
        .dispatch()
        .await
        .into_string()
        .await
        .unwrap();
    assert_eq!(cards_in(&feed), 1);
    assert!(feed.contains("Новая глава"));

    let other = session(app.client.get("/follow/"), &stranger)
        .dispatch()
        .await
        .into_string()
        .await
        .unwrap();
    assert_eq!(cards_in(&other), 0);
}

#[rocket::async_test]
async fn comments_appear_on_the_post_page() {
    let app = app().await;
    let author = create_user(&app.db, "leo").await;
    let reader = create_user(&app.db, "reader").await;
    let post = create_post(&app.db, &author, "Пост для обсуждения", None).await;
    let url = format!("/posts/{}/comment/", post.id);

    let response = session(app.client.post(url.as_str()), &reader)
        .header(ContentType::Form)
        .body("text=Отличный%20пост")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), Some(format!("/posts/{}/", post.id)));

    session(app.client.post(url.as_str()), &reader)
        .header(ContentType::Form)
        .body("text=%20")
        .dispatch()
        .await;
    assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 1);

    let page = app
        .client
        .get(format!("/posts/{}/", post.id))
        .dispatch()
        .await
        .into_string()
        .await
        .unwrap();
    assert!(page.contains("Отличный пост"));
    assert!(page.contains("Всего постов автора: 1"));
}

#[rocket::async_test]
async fn index_is_served_from_cache_until_cleared() {
    let app = app_with_cache(20).await;
    let author = create_user(&app.db, "leo").await;
    create_post(&app.db, &author, "Первый пост", None).await;

    let first = app.client.get("/").dispatch().await.into_string().await.unwrap();
    assert!(first.contains("Первый пост"));

    create_post(&app.db, &author, "Второй пост", None).await;
    let cached = app.client.get("/").dispatch().await.into_string().await.unwrap();
    assert_eq!(cached, first);
    for uri in ["/?page=1", "/?page=999", "/?page=abc"] {
        let same = app.client.get(uri).dispatch().await.into_string().await.unwrap();
        assert_eq!(same, first, "{uri}");
    }

    app.client.rocket().state::<PageCache>().unwrap().clear();
    let fresh = app.client.get("/").dispatch().await.into_string().await.unwrap();
    assert!(fresh.contains("Второй пост"));
}

#[rocket::async_test]
async fn signing_up_and_in() {
    let app = app().await;

    let response = app
        .client
        .post("/auth/signup/")
        .header(ContentType::Form)
        .body(format!("username=anna&password={PASSWORD}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert!(response.cookies().get_private("user_id").is_some());

    let taken = app
        .client
        .post("/auth/signup/")
        .header(ContentType::Form)
        .body(format!("username=anna&password={PASSWORD}"))
        .dispatch()
        .await;
    assert_eq!(taken.status(), Status::Ok);
    assert!(taken
        .into_string()
        .await
        .unwrap()
        .contains("A user with that username already exists."));

    let wrong = app
        .client
        .post("/auth/login/")
        .header(ContentType::Form)
        .body("username=anna&password=wrong-password")
        .dispatch()
        .await;
    assert_eq!(wrong.status(), Status::Ok);

    let response = app
        .client
        .post("/auth/login/?next=/create/")
        .header(ContentType::Form)
        .body(format!("username=anna&password={PASSWORD}"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some("/create/"));
}

#[rocket::async_test]
async fn cyrillic_usernames_redirect_to_an_encoded_profile() {
    let app = app().await;
    let author = create_user(&app.db, "Лев").await;
    let reader = create_user(&app.db, "reader").await;
    let profile = "/profile/%D0%9B%D0%B5%D0%B2/";

    let response = session(app.client.post("/create/"), &author)
        .header(ContentType::Form)
        .body("text=Война%20и%20мир")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some(profile));

    let response = session(app.client.get(format!("{profile}follow/")), &reader)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some(profile));
    assert_eq!(follow::Entity::find().count(&app.db).await.unwrap(), 1);

    let page = app.client.get(profile).dispatch().await;
    assert_eq!(page.status(), Status::Ok);
    assert!(page.into_string().await.unwrap().contains("Война и мир"));
}
