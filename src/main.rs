use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use ftp_script::{
    channel::sftp::SftpChannel, config::Inputs, interpreter::run_script, Session,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let inputs = Inputs::parse();

    let level = if inputs.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let lines = inputs.command_lines()?;
    let config = inputs.connect_config();

    let channel = SftpChannel::connect(&config)
        .await
        .with_context(|| format!("Could not connect to {}:{}", config.host, config.port))?;

    let mut session = Session::new(channel);
    let outcome = run_script(&mut session, &lines, inputs.throwing).await;

    if let Err(err) = session.into_channel().close().await {
        log::warn!("Could not close the session cleanly: {err}");
    }

    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            log::error!("{err}");
            return Err(err.into());
        }
    };

    let json = serde_json::to_string(&result)?;
    println!("{json}");
    if let Some(path) = &inputs.output {
        std::fs::write(path, &json)
            .with_context(|| format!("Could not write {}", path.display()))?;
    }

    Ok(())
}
