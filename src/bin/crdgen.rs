//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of every kind served by the
//! controller as one multi-document YAML stream.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/alibaba.crossplane.io.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use alibaba_provider_controller::crd::{
    LogStore, LogstoreIndex, MachineGroup, Project, ProviderConfig, ProviderConfigUsage, OSS,
};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [
        ProviderConfig::crd(),
        ProviderConfigUsage::crd(),
        OSS::crd(),
        Project::crd(),
        LogStore::crd(),
        LogstoreIndex::crd(),
        MachineGroup::crd(),
    ];

    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
