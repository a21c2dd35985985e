use std::fmt::{Debug, Display};

use newsroom::configuration::get_configuration;
use newsroom::delivery_worker::run_worker_until_stopped;
use newsroom::startup::Application;
use newsroom::telemetry::init_subscriber;
use tokio::task::JoinError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().expect("Failed to read configuration.");
    init_subscriber(
        "newsroom".into(),
        "info".into(),
        std::io::stdout,
        &configuration.telemetry,
    );

    let application = Application::build(configuration.clone())?;
    let application_task = tokio::spawn(application.run_until_stopped());
    let worker_task = tokio::spawn(run_worker_until_stopped(configuration));

    tokio::select! {
        o = application_task => report_exit("API", o),
        o = worker_task => report_exit("Background worker", o),
    };

    Ok(())
}

fn report_exit(task_name: &str, outcome: Result<Result<(), impl Debug + Display>, JoinError>) {
    match outcome {
        Ok(Ok(())) => {
            tracing::info!("{task_name} has exited")
        }
        Ok(Err(e)) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{task_name} failed"
            )
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "{task_name} task failed to complete"
            )
        }
    }
}
