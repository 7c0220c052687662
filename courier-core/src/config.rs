//! Configuration loading: embedded defaults merged with a user override.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    net: NetConfig,
}

#[derive(Deserialize, Default)]
struct OutputConfig {
    local_file: Option<String>,
    remote_file: Option<String>,
}

#[derive(Deserialize, Default)]
struct NetConfig {
    listen_addr: Option<String>,
    agent_name: Option<String>,
}

pub struct Config {
    output: OutputConfig,
    net: NetConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_output(&mut base.output, user.output);
                            merge_net(&mut base.net, user.net);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            output: base.output,
            net: base.net,
        }
    }

    /// File a plain local invocation writes to.
    pub fn local_file(&self) -> &str {
        self.output.local_file.as_deref().unwrap_or("writeToFile.out")
    }

    /// Default target file for remote dispatch.
    pub fn remote_file(&self) -> &str {
        self.output.remote_file.as_deref().unwrap_or("remoteOutput.out")
    }

    pub fn listen_addr(&self) -> &str {
        self.net.listen_addr.as_deref().unwrap_or("127.0.0.1:7171")
    }

    pub fn agent_name(&self) -> &str {
        self.net.agent_name.as_deref().unwrap_or("courier-agent")
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("courier").join("config.toml"))
}

fn merge_output(base: &mut OutputConfig, user: OutputConfig) {
    if user.local_file.is_some() {
        base.local_file = user.local_file;
    }
    if user.remote_file.is_some() {
        base.remote_file = user.remote_file;
    }
}

fn merge_net(base: &mut NetConfig, user: NetConfig) {
    if user.listen_addr.is_some() {
        base.listen_addr = user.listen_addr;
    }
    if user.agent_name.is_some() {
        base.agent_name = user.agent_name;
    }
}
