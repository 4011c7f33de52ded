use anyhow::{anyhow, Result};
use env_logger::Env;

use powernode::constants::{defaults, envvars};
use powernode::{argsets, command, helpers};

const CMD_RUN: &str = "run";
const CMD_CONFIG_GET: &str = "config-get";
const CMD_CONFIG_SET: &str = "config-set";

fn main() -> Result<()> {
    helpers::load_dotenv();
    env_logger::Builder::from_env(Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL))
        .init();

    let mut args = pico_args::Arguments::from_env();
    match args.subcommand()?.as_deref() {
        Some(CMD_RUN) => command::run(),
        Some(CMD_CONFIG_GET) => command::config_get(argsets::ConfigGetArgs {
            section: args.free_from_str()?,
        }),
        Some(CMD_CONFIG_SET) => command::config_set(argsets::ConfigSetArgs {
            section: args.free_from_str()?,
            value: args.free_from_str()?,
        }),
        _ => Err(anyhow!(
            "Subcommand must be one of 'run', 'config-get', 'config-set'"
        )),
    }
}
