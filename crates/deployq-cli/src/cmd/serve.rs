use std::path::Path;

pub fn run(config_path: &Path, port: u16) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let board = super::trello(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        println!("deploy queue for board {} → http://localhost:{port}", config.board.id);
        deployq_server::serve(config, board, port, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    })
}
