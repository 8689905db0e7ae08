use crate::network::{Iface, NAME_SIZE};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub commands: Commands,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Use this configuration file instead of the default one.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand, Clone, Eq, PartialEq)]
pub enum Commands {
    /// Init/Ensure state directories, address pool and assignment store.
    Init(InitArgs),

    /// Assign the next free subnet to an overlay id.
    Alloc(AllocArgs),

    /// Give a subnet back to the pool.
    #[command(arg_required_else_help = true)]
    Reclaim(ReclaimArgs),

    /// Print the network configuration of a /30 subnet.
    #[command(arg_required_else_help = true)]
    Netcfg(NetcfgArgs),

    /// Print the /30 subnet a host address belongs to.
    #[command(arg_required_else_help = true)]
    Subnet(SubnetArgs),

    /// List the lifecycle scripts.
    Cmds(CmdsArgs),

    /// Run an interface lifecycle script.
    #[command(arg_required_else_help = true)]
    Run(RunArgs),

    /// Ask the peer service to echo an overlay id.
    #[command(arg_required_else_help = true)]
    Echo(EchoArgs),

    /// Generate a random name.
    Name(NameArgs),

    /// Show pool and assignment store status.
    Status,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InitArgs {
    /// Discard the assignment store and start over.
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AllocArgs {
    /// Overlay id, generated if omitted.
    #[arg(value_name = "ID")]
    pub id: Option<String>,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReclaimArgs {
    #[arg(value_name = "ID")]
    pub id: String,
    /// Host address inside the subnet to free.
    #[arg(value_name = "ADDR")]
    pub addr: String,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NetcfgArgs {
    #[arg(value_name = "CIDR")]
    pub cidr: String,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubnetArgs {
    #[arg(value_name = "ADDR")]
    pub addr: String,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq)]
pub struct CmdsArgs {
    #[arg(long, value_name = "IFACE")]
    pub iface: Option<Iface>,
    /// Select setup scripts instead of teardown ones.
    #[arg(long)]
    pub up: bool,
}

#[derive(Debug, Args, Clone, Eq, PartialEq)]
pub struct RunArgs {
    #[arg(value_name = "IFACE")]
    pub iface: Iface,
    /// Bring the interface up instead of down.
    #[arg(long)]
    pub up: bool,
}

#[derive(Default, Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EchoArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Debug, Args, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameArgs {
    #[arg(long, short, default_value_t = NAME_SIZE)]
    pub size: usize,
}
