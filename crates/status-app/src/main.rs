use std::env;

use anyhow::{Context, Result};
use tracing::info;

use inverter_client::InverterClient;
use status_app::{StatusConfig, StatusReport};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config_path = parse_config_arg();
    let config = StatusConfig::load_with_path(config_path).context("load config failed")?;
    config.validate().context("config validation failed")?;

    let endpoint = config.inverter.endpoint();
    let mut client = InverterClient::connect(config.inverter.clone())
        .await
        .with_context(|| format!("connect to {}:{} failed", endpoint.host, endpoint.port))?;

    let device_info = client.device_info().await.context("read device info failed")?;
    info!(
        model = %device_info.model_name,
        serial = %device_info.serial_number.trim(),
        single_phase = device_info.single_phase,
        "inverter identified"
    );
    let runtime_data = client
        .runtime_data_for(&device_info, &config.timezone)
        .await
        .context("read runtime data failed")?;

    let report = StatusReport {
        endpoint,
        device_info,
        runtime_data,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize report failed")?
    );
    Ok(())
}

fn parse_config_arg() -> Option<String> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}
