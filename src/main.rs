//! # Alibaba Cloud Provider Controller
//!
//! Kubernetes controller that keeps Alibaba Cloud resources in line with
//! their declarative records.
//!
//! ## Overview
//!
//! One controller runs per managed kind:
//!
//! - `OSS` - object storage buckets
//! - `Project`, `LogStore`, `LogstoreIndex`, `MachineGroup` - log service resources
//!
//! Each pass resolves credentials from the record's `ProviderConfig`,
//! observes the external resource, creates or updates it as needed and
//! reports `Ready`/`Synced` conditions back onto the record. A further
//! controller keeps each `ProviderConfig` until no record uses it.

use alibaba_provider_controller::crd::{LogStore, LogstoreIndex, MachineGroup, Project, OSS};
use alibaba_provider_controller::provider::oss::OssClientFactory;
use alibaba_provider_controller::provider::sls::SlsClientFactory;
use alibaba_provider_controller::runtime::initialization::{check_crd_queryable, initialize};
use alibaba_provider_controller::runtime::watch_loop::{
    run_provider_config_loop, run_watch_loop, spawn_shutdown_handler,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    let oss = Arc::new(OssClientFactory::new().context("Failed to build OSS client factory")?);
    let sls = Arc::new(SlsClientFactory::new().context("Failed to build SLS client factory")?);

    check_crd_queryable::<OSS>(&init.client).await;
    check_crd_queryable::<Project>(&init.client).await;
    check_crd_queryable::<LogStore>(&init.client).await;
    check_crd_queryable::<LogstoreIndex>(&init.client).await;
    check_crd_queryable::<MachineGroup>(&init.client).await;

    spawn_shutdown_handler(init.server_state.clone(), init.cancel.clone());

    let client = init.client.clone();
    let config = init.controller_config.clone();
    let cancel = init.cancel.clone();
    let (provider_configs, buckets, projects, logstores, indexes, machine_groups) = tokio::join!(
        run_provider_config_loop(
            client.clone(),
            init.provider_config_context(),
            config.clone(),
            cancel.clone()
        ),
        run_watch_loop::<OSS>(client.clone(), init.context::<OSS>(oss), config.clone(), cancel.clone()),
        run_watch_loop::<Project>(
            client.clone(),
            init.context::<Project>(sls.clone()),
            config.clone(),
            cancel.clone()
        ),
        run_watch_loop::<LogStore>(
            client.clone(),
            init.context::<LogStore>(sls.clone()),
            config.clone(),
            cancel.clone()
        ),
        run_watch_loop::<LogstoreIndex>(
            client.clone(),
            init.context::<LogstoreIndex>(sls.clone()),
            config.clone(),
            cancel.clone()
        ),
        run_watch_loop::<MachineGroup>(
            client,
            init.context::<MachineGroup>(sls),
            config,
            cancel
        ),
    );
    provider_configs?;
    buckets?;
    projects?;
    logstores?;
    indexes?;
    machine_groups?;

    info!("Controller stopped");
    Ok(())
}
