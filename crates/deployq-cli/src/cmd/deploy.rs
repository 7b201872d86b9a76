use crate::output::{describe_outcome, print_json};
use deployq_core::{CommandOutcome, Coordinator};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
enum Action {
    Enqueue,
    Start,
    Success,
    Fail,
}

pub fn enqueue(config_path: &Path, user: &str, json: bool) -> anyhow::Result<()> {
    run(config_path, Action::Enqueue, user, json)
}

pub fn start(config_path: &Path, user: &str, json: bool) -> anyhow::Result<()> {
    run(config_path, Action::Start, user, json)
}

pub fn success(config_path: &Path, user: &str, json: bool) -> anyhow::Result<()> {
    run(config_path, Action::Success, user, json)
}

pub fn fail(config_path: &Path, user: &str, json: bool) -> anyhow::Result<()> {
    run(config_path, Action::Fail, user, json)
}

async fn apply(
    coordinator: &Coordinator,
    action: Action,
    user: &str,
) -> deployq_core::Result<CommandOutcome> {
    match action {
        Action::Enqueue => coordinator.enqueue(user).await,
        Action::Start => coordinator.start_deploy(user).await,
        Action::Success => coordinator.mark_success(user).await,
        Action::Fail => coordinator.mark_failure(user).await,
    }
}

fn run(config_path: &Path, action: Action, user: &str, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let coordinator = super::connect(&config).await?;
        Ok::<_, anyhow::Error>(apply(&coordinator, action, user).await?)
    })?;

    if json {
        print_json(&outcome)?;
    } else {
        println!("{}", describe_outcome(user, &outcome));
    }
    Ok(())
}
