mod types;
pub mod utils;
pub use types::*;
use utils::{print_outcome, set_logger};

use crate::config::FpndConfig;
use crate::display::{self, NetCfgTable, PoolTable, ScriptTable, TrackerTable};
use crate::exec::get_net_cmds;
use crate::network::{
    address_to_subnet, name_generator, InterfaceState, NetAllocator, NetworkConfig, NAME_SIZE,
};

use clap::Parser;
use owo_colors::OwoColorize;

// Error Handling
use fpnd_error::NetError;
use log::{info, trace};
use miette::{IntoDiagnostic, Result};

impl Cli {
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        Self::switch(cli).await?;
        Ok(())
    }
    fn config(&self) -> Result<FpndConfig> {
        let config = match &self.config {
            Some(path) => FpndConfig::from_file(path)?,
            None => FpndConfig::get()?,
        };
        trace!("{:#?}", config);
        Ok(config)
    }
    pub async fn switch(cli: Cli) -> Result<()> {
        set_logger(&cli);
        let config = cli.config()?;

        match cli.commands {
            /*
             * Create the working directories,
             * generate the address pool and the assignment store.
             */
            Commands::Init(args) => {
                config.ensure_directories()?;
                if args.fresh {
                    NetAllocator::reset_tracker(&config.tracker_path())?;
                }
                let alloc = config.get_allocator()?;
                print_status(&alloc)?;
            }
            Commands::Alloc(args) => {
                let id = args.id.unwrap_or_else(|| name_generator(NAME_SIZE, None));
                let mut alloc = config.get_allocator()?;
                let res = alloc.allocate(&id)?;
                println!("{}", serde_json::to_string_pretty(&res).into_diagnostic()?);
            }
            Commands::Reclaim(args) => {
                let mut alloc = config.get_allocator()?;
                let subnet = alloc.reclaim(&args.id, &args.addr)?;
                println!("{}", subnet);
            }
            Commands::Netcfg(args) => {
                let netcfg = NetworkConfig::from_cidr(&args.cidr)?;
                println!("{}", display::default(NetCfgTable::from(&netcfg))?);
                println!("{}", serde_json::to_string_pretty(&netcfg).into_diagnostic()?);
            }
            Commands::Subnet(args) => {
                println!("{}", address_to_subnet(&args.addr)?);
            }
            /*
             * Without an interface, every script must be there.
             */
            Commands::Cmds(args) => {
                let bin_dir = &config.scripts.bin_dir;
                let state = InterfaceState::from(args.up);
                match get_net_cmds(bin_dir, args.iface, state) {
                    Some(cmds) => {
                        for cmd in cmds {
                            println!("{}", cmd.display());
                        }
                    }
                    None => {
                        println!("{}", display::default(ScriptTable::from(bin_dir))?);
                        let err = NetError::CommandFailure {
                            cmd: "lifecycle scripts".to_owned(),
                            reason: format!("missing in {}", bin_dir.display()),
                        };
                        return Err(err.into());
                    }
                }
            }
            Commands::Run(args) => {
                let state = InterfaceState::from(args.up);
                let runner = config.get_command_runner();
                let outcome = runner.set_iface(args.iface, state)?;
                let script = args.iface.script(state);
                println!("{}", print_outcome(&script, &outcome));
                if !outcome.succeeded {
                    let err = NetError::CommandFailure {
                        cmd: script,
                        reason: outcome.code.to_string(),
                    };
                    return Err(err.into());
                }
            }
            Commands::Echo(args) => {
                let client = config.get_notification_client()?;
                let res = client.echo_with_retry(&args.id).await?;
                info!("{} echoed {}", "[notify]".green(), args.id);
                println!("{}", serde_json::to_string_pretty(&res).into_diagnostic()?);
            }
            Commands::Name(args) => {
                println!("{}", name_generator(args.size, None));
            }
            Commands::Status => {
                let alloc = config.get_allocator()?;
                print_status(&alloc)?;
                let bin_dir = &config.scripts.bin_dir;
                println!("{}", display::default(ScriptTable::from(bin_dir))?);
            }
        }
        Ok(())
    }
}

fn print_status(alloc: &NetAllocator) -> Result<()> {
    println!("{}", display::default(vec![PoolTable::from(alloc)])?);
    println!("{}", display::default(vec![TrackerTable::from(alloc)])?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Iface;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_commands() -> Result<()> {
        let cli = Cli::try_parse_from(["fpnd", "alloc", "a09acf0233ceff5c"]).into_diagnostic()?;
        assert_eq!(
            cli.commands,
            Commands::Alloc(AllocArgs {
                id: Some("a09acf0233ceff5c".to_owned())
            })
        );

        let cli = Cli::try_parse_from(["fpnd", "run", "fpn1", "--up"]).into_diagnostic()?;
        assert_eq!(
            cli.commands,
            Commands::Run(RunArgs {
                iface: Iface::Fpn1,
                up: true
            })
        );

        let cli = Cli::try_parse_from(["fpnd", "cmds", "--iface", "fpn0"]).into_diagnostic()?;
        assert_eq!(
            cli.commands,
            Commands::Cmds(CmdsArgs {
                iface: Some(Iface::Fpn0),
                up: false
            })
        );
        Ok(())
    }

    #[test]
    fn generated_names_default_to_ten_chars() -> Result<()> {
        let cli = Cli::try_parse_from(["fpnd", "name"]).into_diagnostic()?;
        assert_eq!(cli.commands, Commands::Name(NameArgs { size: 10 }));
        let cli = Cli::try_parse_from(["fpnd", "name", "--size", "4"]).into_diagnostic()?;
        assert_eq!(cli.commands, Commands::Name(NameArgs { size: 4 }));
        Ok(())
    }

    #[test]
    fn reject_unknown_iface() {
        assert!(Cli::try_parse_from(["fpnd", "run", "eth0"]).is_err());
    }

    #[tokio::test]
    async fn alloc_through_cli() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let config_path = dir.path().join("config.toml");
        let toml = format!(
            "[pool]\nparent = \"10.0.0.0/29\"\n[state]\ndir = \"{}\"\n",
            dir.path().join("state").display()
        );
        std::fs::write(&config_path, toml).into_diagnostic()?;
        let config_arg = config_path.display().to_string();

        let cli = Cli::try_parse_from(["fpnd", "--config", &config_arg, "init"]).into_diagnostic()?;
        Cli::switch(cli).await?;
        let cli = Cli::try_parse_from(["fpnd", "--config", &config_arg, "alloc", "beef"])
            .into_diagnostic()?;
        Cli::switch(cli).await?;

        let config = FpndConfig::from_file(&config_arg)?;
        let alloc = config.get_allocator()?;
        assert!(alloc.tracker().contains("beef"));
        assert_eq!(alloc.pool().len(), 1);
        Ok(())
    }
}
