use crate::output::{format_idle, print_json, print_table};
use chrono::Utc;
use deployq_core::engine::render_subject;
use std::path::Path;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    let state = rt.block_on(async {
        let coordinator = super::connect(&config).await?;
        Ok::<_, anyhow::Error>(coordinator.deployment_state().await?)
    })?;
    let subject = render_subject(&state, config.board_url.as_deref());

    if json {
        return print_json(&serde_json::json!({
            "queue": state.queue,
            "running": state.running,
            "subject": subject,
        }));
    }

    println!("{subject}");
    println!();

    let now = Utc::now();
    let rows: Vec<Vec<String>> = state
        .running
        .iter()
        .map(|c| ("deploying".to_string(), c))
        .chain(
            state
                .queue
                .iter()
                .enumerate()
                .map(|(i, c)| (format!("#{}", i + 1), c)),
        )
        .map(|(slot, c)| {
            vec![
                slot,
                c.name.clone(),
                format_idle(c.idle_for(now)),
                c.id.clone(),
            ]
        })
        .collect();

    if rows.is_empty() {
        println!("Nobody is deploying or waiting.");
    } else {
        print_table(&["SLOT", "WHO", "IDLE", "CARD"], rows);
    }
    Ok(())
}
