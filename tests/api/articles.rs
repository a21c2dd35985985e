use uuid::Uuid;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{spawn_app, TestUser};

fn article_body() -> serde_json::Value {
    serde_json::json!({
        "title": "A study of left-handed commas",
        "body": "Full text goes here.",
        "keywords": "punctuation, typography",
    })
}

#[tokio::test]
async fn publishing_requires_an_authenticated_session() {
    let app = spawn_app().await;

    let response = app.post_article(&article_body()).await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn invalid_article_data_is_rejected() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app
        .post_article(&serde_json::json!({
            "title": "   ",
            "body": "Full text goes here.",
        }))
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn a_published_article_is_delivered_to_consenting_contacts_only() {
    let app = spawn_app().await;
    let consenting = app
        .store_contact("Ursula Le Guin", "ursula@example.com", true)
        .await;
    app.store_contact("Bob Opt-Out", "bob@example.com", false)
        .await;
    app.login_test_user().await;

    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_article(&article_body()).await;
    assert_eq!(201, response.status().as_u16());

    app.dispatch_all_pending_emails().await;

    let requests = app.email_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = serde_json::from_slice::<serde_json::Value>(&requests[0].body).unwrap();
    assert_eq!(body["to"][0]["email"], "ursula@example.com");
    assert!(app.contact_consent(consenting).await);
}

#[tokio::test]
async fn a_failed_delivery_does_not_block_the_remaining_contacts() {
    let app = spawn_app().await;
    app.store_contact("Ursula Le Guin", "ursula@example.com", true)
        .await;
    app.store_contact("Carol Consenting", "carol@example.com", true)
        .await;
    app.login_test_user().await;

    // The first send blows up; the second contact must still get their email.
    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&app.email_server)
        .await;
    Mock::given(path("/v3/smtp/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_article(&article_body()).await;
    assert_eq!(201, response.status().as_u16());

    app.dispatch_all_pending_emails().await;
}

#[tokio::test]
async fn editing_an_article_does_not_renotify_contacts() {
    let app = spawn_app().await;
    app.store_contact("Ursula Le Guin", "ursula@example.com", true)
        .await;
    app.login_test_user().await;

    let article_id = {
        let _publication_guard = Mock::given(path("/v3/smtp/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .named("Initial publication notice")
            .expect(1)
            .mount_as_scoped(&app.email_server)
            .await;

        let response = app.post_article(&article_body()).await;
        assert_eq!(201, response.status().as_u16());
        let created = response.json::<serde_json::Value>().await.unwrap();
        app.dispatch_all_pending_emails().await;
        Uuid::parse_str(created["id"].as_str().unwrap()).unwrap()
    };

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app
        .put_article(
            article_id,
            &serde_json::json!({
                "title": "A study of left-handed commas, revised",
                "body": "Corrected text goes here.",
                "keywords": "punctuation",
            }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    app.dispatch_all_pending_emails().await;
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete_an_article() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app.post_article(&article_body()).await;
    assert_eq!(201, response.status().as_u16());
    let created = response.json::<serde_json::Value>().await.unwrap();
    let article_id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

    let other_user = TestUser::generate();
    other_user.store(&app.db_pool).await;
    let other_client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();
    let login = other_client
        .post(format!("{}/login", app.address))
        .form(&serde_json::json!({
            "email": &other_user.email,
            "password": &other_user.password,
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, login.status().as_u16());

    let response = other_client
        .put(format!("{}/admin/articles/{}", app.address, article_id))
        .json(&article_body())
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());

    let response = other_client
        .delete(format!("{}/admin/articles/{}", app.address, article_id))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn an_author_can_delete_their_own_article() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app.post_article(&article_body()).await;
    assert_eq!(201, response.status().as_u16());
    let created = response.json::<serde_json::Value>().await.unwrap();
    let article_id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

    let response = app.delete_article(article_id).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.get_article(article_id).await;
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn published_articles_are_publicly_listed_newest_first() {
    let app = spawn_app().await;
    app.login_test_user().await;

    for title in ["First piece", "Second piece"] {
        let response = app
            .post_article(&serde_json::json!({
                "title": title,
                "body": "Full text goes here.",
            }))
            .await;
        assert_eq!(201, response.status().as_u16());
    }

    let response = app
        .api_client
        .get(format!("{}/articles", app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let articles = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(articles.as_array().unwrap().len(), 2);
    assert_eq!(articles[0]["title"], "Second piece");
    assert_eq!(articles[1]["title"], "First piece");
}
