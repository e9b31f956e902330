mod common;

use axum::http::{
    header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, WWW_AUTHENTICATE},
    Method, StatusCode,
};
use common::{body_bytes, fake_jpeg, json_body, json_request, multipart_request, setup_test_app};
use easymeal_backend_lib::routes::MAX_UPLOAD_BYTES;

#[tokio::test]
async fn test_upload_serve_link_delete() {
    let app = setup_test_app();
    let token = app.temp_token().await;
    let photo = fake_jpeg(2048);

    let response = app
        .send(multipart_request(Some(&token), "file", "dinner.jpg", "image/jpeg", &photo))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let filename = json_body(response).await["filename"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(filename.ends_with(".jpg"));
    assert_eq!(filename.len(), 36 + 4);

    // direct serving needs no token
    let response = app
        .send(json_request(Method::GET, &format!("/photo/{filename}"), None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get(CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(body_bytes(response).await, photo);

    // presigned link, internal authority rewritten for clients
    let response = app
        .send(json_request(
            Method::GET,
            &format!("/photo/{filename}/url"),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    assert!(
        location.starts_with(&format!("http://localhost:9000/photos/{filename}?")),
        "{location}"
    );
    assert!(location.contains("X-Amz-Expires=3600"));

    app.state.media.delete(&filename).await;
    let response = app
        .send(json_request(Method::GET, &format!("/photo/{filename}"), None, None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app
        .send(json_request(
            Method::GET,
            &format!("/photo/{filename}/url"),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_keeps_extension_and_type() {
    let app = setup_test_app();
    let token = app.temp_token().await;

    let response = app
        .send(multipart_request(Some(&token), "file", "plate.PNG", "image/png", b"png"))
        .await;
    let filename = json_body(response).await["filename"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(filename.ends_with(".png"));
    assert_eq!(app.objects.content_type(&filename).as_deref(), Some("image/png"));

    let response = app
        .send(multipart_request(Some(&token), "file", "noext", "image/webp", b"webp"))
        .await;
    let filename = json_body(response).await["filename"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(filename.ends_with(".jpg"));

    // unknown photo types are stored under the default name and type
    let response = app
        .send(multipart_request(Some(&token), "file", "dinner.heic", "image/heic", b"heic"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let filename = json_body(response).await["filename"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(filename.ends_with(".jpg"), "{filename}");
    assert_eq!(app.objects.content_type(&filename).as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = setup_test_app();
    let token = app.temp_token().await;

    // not an image
    let response = app
        .send(multipart_request(Some(&token), "file", "notes.txt", "text/plain", b"hello"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "MEDIA_001");

    // wrong field name
    let response = app
        .send(multipart_request(Some(&token), "photo", "a.jpg", "image/jpeg", b"x"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VAL_001");

    // no token
    let response = app
        .send(multipart_request(None, "file", "a.jpg", "image/jpeg", b"x"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(WWW_AUTHENTICATE).unwrap(), "Bearer");

    assert!(app.objects.is_empty());
}

#[tokio::test]
async fn test_upload_size_limit() {
    let app = setup_test_app();
    let token = app.temp_token().await;

    let response = app
        .send(multipart_request(
            Some(&token),
            "file",
            "big.jpg",
            "image/jpeg",
            &fake_jpeg(MAX_UPLOAD_BYTES + 1),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"]["code"], "SIZE_001");

    let response = app
        .send(multipart_request(
            Some(&token),
            "file",
            "huge.jpg",
            "image/jpeg",
            &fake_jpeg(MAX_UPLOAD_BYTES * 2),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app
        .send(multipart_request(
            Some(&token),
            "file",
            "limit.jpg",
            "image/jpeg",
            &fake_jpeg(MAX_UPLOAD_BYTES),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.objects.len(), 1);
}

#[tokio::test]
async fn test_unknown_and_invalid_names_are_not_found() {
    let app = setup_test_app();
    let token = app.temp_token().await;

    for name in ["missing.jpg", ".hidden.jpg", "a%20b.jpg"] {
        let response = app
            .send(json_request(Method::GET, &format!("/photo/{name}"), None, None))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{name}");

        let response = app
            .send(json_request(
                Method::GET,
                &format!("/photo/{name}/url"),
                Some(&token),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{name}");
    }

    // the link endpoint is authenticated
    let response = app
        .send(json_request(Method::GET, "/photo/missing.jpg/url", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
