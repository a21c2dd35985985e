use crate::helpers::spawn_app;

#[tokio::test]
async fn invalid_credentials_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "email": &app.test_user.email,
            "password": "definitely-the-wrong-password",
        }))
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn signup_creates_an_author_with_a_live_session() {
    let app = spawn_app().await;

    let response = app
        .post_signup(&serde_json::json!({
            "name": "New Author",
            "email": "author@example.com",
            "password": "correct horse battery staple",
        }))
        .await;
    assert_eq!(201, response.status().as_u16());

    // The fresh session can publish straight away.
    let response = app
        .post_article(&serde_json::json!({
            "title": "Hello from a new author",
            "body": "Full text goes here.",
        }))
        .await;
    assert_eq!(201, response.status().as_u16());
}

#[tokio::test]
async fn signing_up_twice_with_the_same_email_is_rejected() {
    let app = spawn_app().await;
    let body = serde_json::json!({
        "name": "New Author",
        "email": "author@example.com",
        "password": "correct horse battery staple",
    });

    let response = app.post_signup(&body).await;
    assert_eq!(201, response.status().as_u16());

    let response = app.post_signup(&body).await;
    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn a_short_password_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .post_signup(&serde_json::json!({
            "name": "New Author",
            "email": "author@example.com",
            "password": "short",
        }))
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn logging_out_ends_the_session() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app.post_logout().await;
    assert_eq!(200, response.status().as_u16());

    let response = app
        .post_article(&serde_json::json!({
            "title": "After logout",
            "body": "Full text goes here.",
        }))
        .await;
    assert_eq!(401, response.status().as_u16());
}
