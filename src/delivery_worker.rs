use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{field::display, Span};
use uuid::Uuid;

use crate::{
    configuration::Settings,
    domain::{ApplicationBaseUrl, Contact, ContactEmail, ContactName},
    email_client::EmailClient,
    startup::get_connection_pool,
    unsubscribe_token::UnsubscribeTokenCodec,
};

pub enum ExecutionOutcome {
    TaskCompleted,
    EmptyQueue,
}

#[tracing::instrument(
    skip_all,
    fields(article_id=tracing::field::Empty, contact_id=tracing::field::Empty),
    err
)]
pub async fn try_execute_task(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &ApplicationBaseUrl,
    token_codec: &UnsubscribeTokenCodec,
) -> anyhow::Result<ExecutionOutcome> {
    let task = dequeue_task(pool).await?;
    let Some((transaction, task)) = task else {
        return Ok(ExecutionOutcome::EmptyQueue);
    };

    Span::current()
        .record("article_id", &display(task.article_id))
        .record("contact_id", &display(task.contact_id));

    // Consent is re-checked at delivery time; a contact who opted out after
    // the article was published is silently skipped.
    if task.consent_email_updates {
        match (
            ContactEmail::parse(task.email.clone()),
            ContactName::parse(task.name.clone()),
        ) {
            (Ok(email), Ok(name)) => {
                if let Err(e) = deliver_notification(
                    pool,
                    email_client,
                    base_url,
                    token_codec,
                    &task,
                    Contact { name, email },
                )
                .await
                {
                    tracing::error!(
                        error.cause_chain = ?e,
                        "Failed to deliver an article notification to a contact. Skipping.",
                    );
                }
            }
            other => {
                tracing::error!(
                    "Skipping a consenting contact. Their stored contact details are invalid. {other:?}",
                );
            }
        }
    }

    delete_task(transaction, task.article_id, task.contact_id).await?;

    Ok(ExecutionOutcome::TaskCompleted)
}

async fn deliver_notification(
    pool: &PgPool,
    email_client: &EmailClient,
    base_url: &ApplicationBaseUrl,
    token_codec: &UnsubscribeTokenCodec,
    task: &DeliveryTask,
    recipient: Contact,
) -> anyhow::Result<()> {
    let title = get_article_title(pool, task.article_id).await?;
    let article_url = base_url
        .join(&format!("articles/{}", task.article_id))
        .map_err(|e| anyhow::anyhow!(e))?;
    let token = token_codec.mint(task.contact_id);
    let unsubscribe_url = base_url
        .join(&format!("unsubscribe/{token}/"))
        .map_err(|e| anyhow::anyhow!(e))?;
    let (subject, body) = notification_email(
        &title,
        recipient.name.as_ref(),
        article_url.as_str(),
        unsubscribe_url.as_str(),
    );
    email_client.send_email(&recipient, &subject, &body).await
}

fn notification_email(
    article_title: &str,
    contact_name: &str,
    article_url: &str,
    unsubscribe_url: &str,
) -> (String, String) {
    let subject = format!("New Article: {article_title}");
    let body = format!(
        "Hello {contact_name},\n\n\
         A new article has been published: {article_title}\n\
         Read it here: {article_url}\n\n\
         If you no longer wish to receive these updates, \
         you can unsubscribe here:\n{unsubscribe_url}\n"
    );
    (subject, body)
}

type PgTransaction = Transaction<'static, Postgres>;

#[derive(sqlx::FromRow)]
struct DeliveryTask {
    article_id: Uuid,
    contact_id: Uuid,
    name: String,
    email: String,
    consent_email_updates: bool,
}

#[tracing::instrument(skip_all)]
async fn dequeue_task(pg_pool: &PgPool) -> anyhow::Result<Option<(PgTransaction, DeliveryTask)>> {
    let mut transaction = pg_pool.begin().await?;
    let task = sqlx::query_as::<_, DeliveryTask>(
        r#"
        SELECT q.article_id, q.contact_id, c.name, c.email, c.consent_email_updates
        FROM article_delivery_queue AS q INNER JOIN contact_messages AS c
        ON q.contact_id = c.id
        FOR UPDATE OF q
        SKIP LOCKED
        LIMIT 1
        "#,
    )
    .fetch_optional(&mut *transaction)
    .await?;
    Ok(task.map(|task| (transaction, task)))
}

#[tracing::instrument(skip_all)]
async fn delete_task(
    mut transaction: PgTransaction,
    article_id: Uuid,
    contact_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM article_delivery_queue
        WHERE
            article_id = $1 AND
            contact_id = $2
        "#,
    )
    .bind(article_id)
    .bind(contact_id)
    .execute(&mut *transaction)
    .await?;
    transaction.commit().await?;
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn get_article_title(pg_pool: &PgPool, article_id: Uuid) -> anyhow::Result<String> {
    let title = sqlx::query_scalar::<_, String>(
        r#"
        SELECT title
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(article_id)
    .fetch_one(pg_pool)
    .await?;
    Ok(title)
}

async fn worker_loop(
    pg_pool: PgPool,
    email_client: EmailClient,
    base_url: ApplicationBaseUrl,
    token_codec: UnsubscribeTokenCodec,
) -> anyhow::Result<()> {
    loop {
        match try_execute_task(&pg_pool, &email_client, &base_url, &token_codec).await {
            Ok(ExecutionOutcome::EmptyQueue) => {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Err(_) => {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(ExecutionOutcome::TaskCompleted) => {}
        }
    }
}

pub async fn run_worker_until_stopped(configuration: Settings) -> anyhow::Result<()> {
    let connection_pool = get_connection_pool(&configuration.database);
    let email_client = configuration.email.client()?;
    let token_codec =
        UnsubscribeTokenCodec::new(configuration.application.unsubscribe_secret.clone());
    worker_loop(
        connection_pool,
        email_client,
        configuration.application.base_url,
        token_codec,
    )
    .await
}
