use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "provisioner",
    about = "Multi-cloud cluster provisioner core — demo/dev harness over the in-memory adapters",
    version
)]
pub struct Cli {
    /// Path to a launch request JSON file (see demos/request.json).
    #[arg(long, global = true, default_value = "demos/request.json")]
    pub request: PathBuf,

    /// Path to a DTRS catalog JSON file mapping deployable types to
    /// cluster documents (see demos/dtrs-catalog.json).
    #[arg(long, global = true, default_value = "demos/dtrs-catalog.json")]
    pub dtrs_catalog: PathBuf,

    /// Path to the provisioner settings YAML (site endpoints, broker
    /// endpoint, poll interval).
    #[arg(long, global = true, default_value = "demos/settings.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run prepare_provision and print the resulting launch/node records.
    Prepare,

    /// Run prepare_provision then execute_provision.
    Execute,

    /// Run the full pipeline through N reconciler cycles
    /// (query_nodes, simulating node check-ins to the context broker).
    Reconcile {
        #[arg(long, default_value_t = 3)]
        cycles: u32,
    },

    /// Run the full pipeline to RUNNING, then terminate the launch.
    Terminate {
        /// Only mark nodes TERMINATING; skip the driver destroy_node calls.
        #[arg(long)]
        mark_only: bool,
    },
}
