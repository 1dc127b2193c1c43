use std::time::Duration;

use clap::Parser;
use eyre::{Result, eyre};
use humantime::parse_duration;

use crate::consts::DEFAULT_SSH_USER;
use crate::decommission::DecommissionParams;
use crate::drain::DrainParams;

#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Name of the node to decommission. Also used as the ssh host unless the node
    /// reports a Hostname address.
    pub node: String,

    /// Remote user for the shutdown command
    #[arg(long, default_value = DEFAULT_SSH_USER)]
    pub ssh_user: String,

    /// How long to wait for the pods to leave the node
    #[arg(long, default_value = "600s", value_parser = parse_duration)]
    pub timeout: Duration,

    #[arg(long, default_value = "5s", value_parser = parse_poll_interval)]
    pub poll_interval: Duration,

    /// Grace period of each eviction, in whole seconds
    #[arg(long, default_value = "30s", value_parser = parse_grace_period)]
    pub grace_period: Duration,

    /// Extra ssh option, passed as `-o <OPTION>`. Can be repeated.
    #[arg(short = 'o', long = "ssh-option", value_name = "OPTION")]
    pub ssh_options: Vec<String>,
}

impl Config {
    pub fn decommission_params(&self) -> DecommissionParams {
        DecommissionParams {
            node_name: self.node.clone(),
            ssh_user: self.ssh_user.clone(),
            drain: DrainParams {
                timeout: self.timeout,
                poll_interval: self.poll_interval,
                grace_period: self.grace_period,
            },
        }
    }
}

fn parse_poll_interval(input: &str) -> Result<Duration> {
    let duration = parse_duration(input)?;
    if duration.is_zero() {
        return Err(eyre!("poll-interval should be > 0s"));
    }

    Ok(duration)
}

fn parse_grace_period(input: &str) -> Result<Duration> {
    let duration = parse_duration(input)?;
    if duration.subsec_nanos() != 0 {
        return Err(eyre!("grace-period should be whole seconds"));
    }
    if duration.as_secs() > u64::from(u32::MAX) {
        return Err(eyre!("grace-period should be <= {}s", u32::MAX));
    }

    Ok(duration)
}
