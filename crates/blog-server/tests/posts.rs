mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{id_of, TestApp, TestUser};
use pretty_assertions::assert_eq;
use serde_json::json;

const PNG: &str = "iVBORw0KGgo=";

#[tokio::test]
async fn creating_a_post_sanitizes_and_externalizes_images() {
    let app = TestApp::new();
    let writer = TestUser::user("writer");
    let content = format!(
        "<h1 onclick=\"steal()\">Title</h1><script>alert(1)</script>\
         <p><img src=\"data:image/png;base64,{PNG}\" alt=\"a\"></p>\
         <img src=\"javascript:alert(1)\"><img src=\"https://cdn.example/b.gif\">"
    );

    let body = app.create_post(&writer, "Images", &content).await;
    assert_eq!(body["message"], "Content created successfully.");
    let post = &body["post"];
    let post_id = id_of(post);

    assert_eq!(
        post["content"].as_str().unwrap(),
        format!(
            "<h1>Title</h1><p><img src=\"/blogImages/{post_id}/1/1.png\" alt=\"a\"></p>\
             <img><img src=\"/blogImages/{post_id}/1/2.gif\">"
        )
    );
    assert_eq!(post["category"], "tech");
    assert_eq!(post["author"], "writer");
    assert_eq!(post["assets"].as_array().unwrap().len(), 2);
    assert_eq!(body["assets"]["stored"], json!([format!("{post_id}/1/1.png")]));
    assert_eq!(body["assets"]["skipped"], json!([format!("{post_id}/1/2.gif")]));
    assert_eq!(app.blobs.paths().await, vec![format!("{post_id}/1/1.png")]);
    assert!(post.get("image").is_none());
}

#[tokio::test]
async fn cover_images_are_stored_replaced_and_removed() {
    let app = TestApp::new();
    let writer = TestUser::user("writer");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/ped/blogs",
            Some(&writer),
            Some(json!({
                "title": "Cover",
                "content": format!("<img src=\"data:image/png;base64,{PNG}\">"),
                "image": "data:image/gif;base64,R0lGOA==",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let post_id = id_of(&body["post"]);
    assert_eq!(
        body["post"]["image"].as_str().unwrap(),
        format!("/blogImages/{post_id}/cover-1.gif")
    );
    assert_eq!(
        app.blobs.get(&format!("{post_id}/cover-1.gif")).await.as_deref(),
        Some(&b"GIF8"[..])
    );
    let uri = format!("/api/v1/ped/blogs/{post_id}");

    let (status, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(&writer),
            Some(json!({ "image": format!("data:image/png;base64,{PNG}") })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["post"]["image"].as_str().unwrap(),
        format!("/blogImages/{post_id}/cover-2.png")
    );
    assert_eq!(
        app.blobs.paths().await,
        vec![format!("{post_id}/1/1.png"), format!("{post_id}/cover-2.png")]
    );

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&writer), Some(json!({ "image": "not an image" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&writer), Some(json!({ "image": "" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["post"].get("image").is_none());
    assert_eq!(app.blobs.paths().await, vec![format!("{post_id}/1/1.png")]);

    let (status, _) = app.request(Method::DELETE, &uri, Some(&writer), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.blobs.paths().await.is_empty());
}

#[tokio::test]
async fn malformed_requests_carry_an_error_kind() {
    let app = TestApp::new();
    let user = TestUser::user("u");

    let (status, body) = app
        .request(Method::GET, "/api/v1/ped/blogs/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
    assert!(body["error"].is_string());

    let (status, body) = app
        .request(Method::POST, "/api/v1/ped/blogs", Some(&user), Some(json!({ "content": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/ped/blogs")
        .header(header::AUTHORIZATION, format!("Bearer {}", user.token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = common::send(app.router.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = app
        .request(Method::GET, "/api/v1/ped/blogs/paginated?page=first", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/ped/blogs/{}/comments/42", uuid::Uuid::new_v4()),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn posts_are_public_to_read_but_guarded_to_change() {
    let app = TestApp::new();
    let owner = TestUser::user("owner");
    let stranger = TestUser::user("stranger");
    let admin = TestUser::admin("admin");
    let post_id = id_of(&app.create_post(&owner, "Guarded", "<p>x</p>").await["post"]);
    let uri = format!("/api/v1/ped/blogs/{post_id}");

    let (status, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Guarded");

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&stranger), Some(json!({ "title": "Mine" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) = app.request(Method::PUT, &uri, Some(&owner), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid update data");

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&admin), Some(json!({ "title": "Edited", "category": "" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blog updated successfully.");
    assert_eq!(body["post"]["title"], "Edited");
    assert!(body["post"].get("category").is_none());

    let (status, _) = app.request(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.request(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);

    let (status, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn authentication_failures_are_unauthenticated() {
    let app = TestApp::new();

    let (status, body) = app
        .request(Method::POST, "/api/v1/ped/blogs", None, Some(json!({ "title": "t", "content": "" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let forged = TestUser {
        id: uuid::Uuid::new_v4(),
        username: "forged".to_string(),
        token: "not-a-jwt".to_string(),
    };
    let (status, _) = app
        .request(Method::POST, "/api/v1/ped/blogs", Some(&forged), Some(json!({ "title": "t", "content": "" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // bare tokens are accepted as well
    let user = TestUser::user("bare");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/ped/blogs")
        .header(header::AUTHORIZATION, user.token.clone())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "title": "Bare", "content": "" }).to_string()))
        .unwrap();
    let (status, _) = common::send(app.router.clone(), request).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn blank_titles_are_rejected() {
    let app = TestApp::new();
    let user = TestUser::user("u");

    let (status, body) = app
        .request(Method::POST, "/api/v1/ped/blogs", Some(&user), Some(json!({ "title": "  ", "content": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn listings() {
    let app = TestApp::new();
    let writer = TestUser::user("writer");
    let fan = TestUser::user("fan");
    let admin = TestUser::admin("admin");

    let mut ids = Vec::new();
    for n in 0..12 {
        ids.push(id_of(&app.create_post(&writer, &format!("post {n}"), "").await["post"]));
    }
    let liked = &ids[3];
    app.request(Method::POST, &format!("/api/v1/ped/blogs/{liked}/like"), Some(&fan), None)
        .await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/ped/blogs/paginated?page=2", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["count"], 2);
    assert_eq!(body["metadata"]["page"], 2);

    let (_, body) = app.request(Method::GET, "/api/v1/ped/top-blogs", None, None).await;
    assert_eq!(body["metadata"]["count"], 10);
    assert_eq!(body["posts"][0]["id"].as_str().unwrap(), liked.as_str());

    let (_, body) = app
        .request(Method::GET, "/api/v1/ped/blogs/by-category/TECH?limit=5", None, None)
        .await;
    assert_eq!(body["metadata"]["count"], 5);
    assert_eq!(body["metadata"]["total"], 12);
    let (status, body) = app
        .request(Method::GET, "/api/v1/ped/blogs/by-category/cooking", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = app.request(Method::GET, "/api/v1/ped/blogs", Some(&writer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.request(Method::GET, "/api/v1/ped/blogs", Some(&admin), None).await;
    assert_eq!(body["metadata"]["count"], 12);

    let owner_uri = format!("/api/v1/ped/blogs/by-owner/{}", writer.id);
    let (status, _) = app.request(Method::GET, &owner_uri, Some(&writer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.request(Method::GET, &owner_uri, Some(&admin), None).await;
    assert_eq!(body["metadata"]["count"], 10);
    assert_eq!(
        body["metadata"]["next_page"].as_str().unwrap(),
        format!("{owner_uri}?page=2")
    );
    let (_, body) = app
        .request(Method::GET, &format!("{owner_uri}?page=2"), Some(&admin), None)
        .await;
    assert_eq!(body["metadata"]["count"], 2);
    assert!(body["metadata"].get("next_page").is_none());
}

#[tokio::test]
async fn health_check_responds() {
    let app = TestApp::new();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = common::send(app.router.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::Value::String("OK".to_string()));
}
