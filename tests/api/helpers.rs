use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use newsroom::configuration::{get_configuration, DatabaseSettings};
use newsroom::delivery_worker::{try_execute_task, ExecutionOutcome};
use newsroom::domain::ApplicationBaseUrl;
use newsroom::email_client::EmailClient;
use newsroom::startup::{get_connection_pool, Application};
use newsroom::telemetry::init_subscriber;
use newsroom::unsubscribe_token::UnsubscribeTokenCodec;
use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::MockServer;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    let configuration = get_configuration().expect("Failed to read configuration.");

    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::stdout,
            &configuration.telemetry,
        );
    } else {
        init_subscriber(
            subscriber_name,
            default_filter_level,
            std::io::sink,
            &configuration.telemetry,
        );
    };
});

pub struct TestApp {
    pub port: u16,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
    pub email_client: EmailClient,
    pub base_url: ApplicationBaseUrl,
    pub token_codec: UnsubscribeTokenCodec,
    pub test_user: TestUser,
}

pub struct NotificationLinks {
    pub article: reqwest::Url,
    pub unsubscribe: reqwest::Url,
}

impl TestApp {
    pub async fn post_contact(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/contact", self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_signup(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/signup", self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_login(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/login", self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_logout(&self) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/logout", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_article(&self, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/articles", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put_article(&self, article_id: Uuid, body: &Value) -> reqwest::Response {
        self.api_client
            .put(format!("{}/admin/articles/{}", self.address, article_id))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete_article(&self, article_id: Uuid) -> reqwest::Response {
        self.api_client
            .delete(format!("{}/admin/articles/{}", self.address, article_id))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_article(&self, article_id: Uuid) -> reqwest::Response {
        self.api_client
            .get(format!("{}/articles/{}", self.address, article_id))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login_test_user(&self) {
        let response = self
            .post_login(&serde_json::json!({
                "email": &self.test_user.email,
                "password": &self.test_user.password,
            }))
            .await;
        assert_eq!(200, response.status().as_u16());
    }

    /// Runs delivery tasks the way the background worker would, until the
    /// queue is drained.
    pub async fn dispatch_all_pending_emails(&self) {
        loop {
            match try_execute_task(
                &self.db_pool,
                &self.email_client,
                &self.base_url,
                &self.token_codec,
            )
            .await
            .expect("Failed to execute a delivery task.")
            {
                ExecutionOutcome::EmptyQueue => break,
                ExecutionOutcome::TaskCompleted => {}
            }
        }
    }

    pub async fn store_contact(&self, name: &str, email: &str, consent: bool) -> Uuid {
        let contact_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO contact_messages \
             (id, name, email, phone, message, consent_email_updates, submitted_at) \
             VALUES ($1, $2, $3, '', 'Please keep me posted.', $4, now())",
        )
        .bind(contact_id)
        .bind(name)
        .bind(email)
        .bind(consent)
        .execute(&self.db_pool)
        .await
        .expect("Failed to store a test contact.");
        contact_id
    }

    pub async fn contact_consent(&self, contact_id: Uuid) -> bool {
        sqlx::query_scalar("SELECT consent_email_updates FROM contact_messages WHERE id = $1")
            .bind(contact_id)
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to fetch a test contact's consent flag.")
    }

    pub fn get_notification_links(&self, email_request: &wiremock::Request) -> NotificationLinks {
        let body = serde_json::from_slice::<Value>(&email_request.body).unwrap();
        let text = body["textContent"].as_str().unwrap();

        let links: Vec<_> = linkify::LinkFinder::new()
            .links(text)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .map(|l| reqwest::Url::parse(l.as_str()).unwrap())
            .collect();
        assert_eq!(links.len(), 2);
        for link in &links {
            assert_eq!(link.port(), Some(self.port));
        }

        let (unsubscribe, article): (Vec<_>, Vec<_>) = links
            .into_iter()
            .partition(|url| url.path().starts_with("/unsubscribe/"));
        NotificationLinks {
            article: article.into_iter().next().unwrap(),
            unsubscribe: unsubscribe.into_iter().next().unwrap(),
        }
    }
}

pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub fn generate() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password: Uuid::new_v4().to_string(),
        }
    }

    pub async fn store(&self, pool: &PgPool) {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let password_hash = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(15000, 2, 1, None).unwrap(),
        )
        .hash_password(self.password.as_bytes(), &salt)
        .unwrap()
        .to_string();

        sqlx::query(
            "INSERT INTO users (user_id, email, name, password_hash, created_at) \
             VALUES ($1, $2, 'Test Author', $3, now())",
        )
        .bind(self.user_id)
        .bind(&self.email)
        .bind(password_hash)
        .execute(pool)
        .await
        .expect("Failed to store the test user.");
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        c.email.endpoint = email_server.uri();
        c
    };
    configure_database(&configuration.database).await;

    let application =
        Application::build(configuration.clone()).expect("Failed to build application.");
    let application_port = application.port();
    let address = format!("http://127.0.0.1:{}", application_port);
    tokio::spawn(application.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();

    let test_app = TestApp {
        port: application_port,
        address,
        db_pool: get_connection_pool(&configuration.database),
        email_server,
        api_client,
        email_client: configuration
            .email
            .client()
            .expect("Failed to build the email client."),
        base_url: ApplicationBaseUrl::parse(&format!("http://127.0.0.1:{}", application_port))
            .unwrap(),
        token_codec: UnsubscribeTokenCodec::new(
            configuration.application.unsubscribe_secret.clone(),
        ),
        test_user: TestUser::generate(),
    };
    test_app.test_user.store(&test_app.db_pool).await;
    test_app
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    // Migrate database
    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");

    connection_pool
}
