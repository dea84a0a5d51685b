use anyhow::Result;
use clap::Parser;
use commands::Cli;
use harvest_common::observability::{LogConfig, init_logging};
use harvest_runtime::HarvestRuntime;
use std::time::Duration;
mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins, flags win over env)
    let cfg = commands::load_config(&cli)?;

    init_logging(LogConfig::from_settings("harvest", &cfg.logging))?;

    let runtime = HarvestRuntime::build("harvest-worker", None)?;
    let handle = runtime.handle();
    let _ctrl_c = handle.cancel_on_ctrl_c();

    let result = runtime.block_on(commands::run(cli, cfg, handle.cancellation()));
    runtime.shutdown(Duration::from_millis(500));
    result
}
