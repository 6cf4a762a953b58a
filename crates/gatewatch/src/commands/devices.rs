//! Orchestrator device listing and readiness wait.

use std::time::Duration;

use gatewatch_api::orchestrator::OrchestratorClient;

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let file_config = config::load_config_or_default();
    let base = config::resolve_orchestrator_url(global, &file_config);

    let base_url: url::Url = base.parse().map_err(|e| CliError::Validation {
        field: "orchestrator".into(),
        reason: format!("invalid URL '{base}': {e}"),
    })?;

    let client = OrchestratorClient::new(base_url, Duration::from_secs(global.timeout))
        .map_err(|e| CliError::Orchestrator {
            reason: e.to_string(),
        })?;

    if let Some(device_id) = args.wait {
        let ready = client
            .wait_ready(&args.kind, &device_id, Duration::from_secs(global.timeout))
            .await;
        if !ready {
            return Err(CliError::NotReady { device_id });
        }
        eprintln!("{device_id} is ready");
        return Ok(());
    }

    let devices = client
        .list_devices()
        .await
        .map_err(|e| CliError::Orchestrator {
            reason: e.to_string(),
        })?;

    if devices.is_empty() {
        eprintln!("no devices provisioned");
        return Ok(());
    }

    println!("{}", output::device_table(&devices));
    Ok(())
}
