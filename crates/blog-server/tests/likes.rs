mod common;

use axum::http::{Method, StatusCode};
use common::{id_of, TestApp, TestUser};

#[tokio::test]
async fn like_and_unlike_keep_the_counter_in_step() {
    let app = TestApp::new();
    let writer = TestUser::user("writer");
    let fan = TestUser::user("fan");
    let post_id = id_of(&app.create_post(&writer, "Likes", "").await["post"]);
    let like = format!("/api/v1/ped/blogs/{post_id}/like");
    let unlike = format!("/api/v1/ped/blogs/{post_id}/unlike");

    let (status, body) = app.request(Method::POST, &like, Some(&fan), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blog liked successfully.");
    assert_eq!(body["post"]["likes_count"], 1);
    assert_eq!(body["post"]["likes"][0]["username"], "fan");

    let (status, body) = app.request(Method::POST, &like, Some(&fan), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["error"], "You have already liked this blog.");

    let (status, body) = app.request(Method::POST, &unlike, Some(&fan), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blog unliked successfully.");
    assert_eq!(body["post"]["likes_count"], 0);

    let (status, body) = app.request(Method::POST, &unlike, Some(&fan), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have not liked this blog.");

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/ped/blogs/{post_id}"), None, None)
        .await;
    assert_eq!(body["likes_count"], 0);
    assert_eq!(body["version"], 3);
}

#[tokio::test]
async fn concurrent_likes_all_land() {
    let app = TestApp::new();
    let writer = TestUser::user("writer");
    let post_id = id_of(&app.create_post(&writer, "Popular", "").await["post"]);

    let mut handles = Vec::new();
    for n in 0..16 {
        let router = app.router.clone();
        let fan = TestUser::user(&format!("fan{n}"));
        let uri = format!("/api/v1/ped/blogs/{post_id}/like");
        handles.push(tokio::spawn(async move {
            let request = axum::http::Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("Authorization", format!("Bearer {}", fan.token))
                .body(axum::body::Body::empty())
                .unwrap();
            common::send(router, request).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let (_, body) = app
        .request(Method::GET, &format!("/api/v1/ped/blogs/{post_id}"), None, None)
        .await;
    assert_eq!(body["likes_count"], 16);
    assert_eq!(body["likes"].as_array().unwrap().len(), 16);
}
