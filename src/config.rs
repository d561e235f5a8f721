// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Error, ErrorKind, Result};

use serde::{Deserialize, Serialize};
use toml;

#[cfg(not(test))]
const DEFAULT_CONF_DIR: &str = {
    match option_env!("CONFDIR") {
        Some(p) => p,
        None => "/usr/local/etc",
    }
};
#[cfg(test)]
const DEFAULT_CONF_DIR: &str = "test";

pub const DEFAULT_CONF_NAME: &str = "pemstore.conf";

/// Number of slots a token built on the store can expose
pub const MAX_SLOTS: u32 = 8;

/// A certificate file, optionally paired with the file holding its key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateFile {
    pub path: String,
    pub key: Option<String>,
    /// Adds an NSS trust object for every certificate in the file
    #[serde(default)]
    pub ca: bool,
}

/// A file holding private keys with no certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFile {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub slot: u32,
    pub description: Option<String>,
    #[serde(default)]
    pub certificates: Vec<CertificateFile>,
    #[serde(default)]
    pub keys: Vec<KeyFile>,
}

impl Slot {
    pub fn new(slot: u32) -> Slot {
        Slot {
            slot: slot,
            description: None,
            certificates: Vec::new(),
            keys: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl Config {
    pub fn new() -> Config {
        Config { slots: Vec::new() }
    }

    pub fn add_slot(&mut self, slot: Slot) -> Result<()> {
        if slot.slot >= MAX_SLOTS {
            return Err(Error::with_errmsg(
                ErrorKind::Config,
                format!("slot {} is not below {}", slot.slot, MAX_SLOTS),
            ));
        }
        for s in &self.slots {
            if slot.slot == s.slot {
                return Err(Error::with_errmsg(
                    ErrorKind::Config,
                    format!("duplicate slot {}", slot.slot),
                ));
            }
        }
        self.slots.push(slot);
        Ok(())
    }

    pub fn find_conf() -> Result<String> {
        /* First check for our own env var,
         * this has the highest precedence */
        if let Ok(var) = env::var("PEMSTORE_CONF") {
            return Ok(var);
        }
        /* Freedesktop specification for config dirs first
         * then fallback to use $HOME/.config, if that is also not
         * available see if we have access to a system store */
        let datafile = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/pemstore/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => {
                    format!("{}/.config/pemstore/{}", home, DEFAULT_CONF_NAME)
                }
                Err(_) => format!(
                    "{}/pemstore/{}",
                    DEFAULT_CONF_DIR, DEFAULT_CONF_NAME
                ),
            },
        };
        if Path::new(&datafile).is_file() {
            Ok(datafile)
        } else {
            Err(Error::with_errmsg(
                ErrorKind::Config,
                format!("no configuration found at {}", datafile),
            ))
        }
    }

    /// Parses a TOML document, then re-adds every slot through
    /// [Config::add_slot] so bounds and duplicates are checked
    pub fn from_toml_str(config_str: &str) -> Result<Config> {
        let parsed: Config = toml::from_str(config_str)?;
        let mut conf = Config::new();
        for slot in parsed.slots {
            conf.add_slot(slot)?;
        }
        Ok(conf)
    }

    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = fs::read_to_string(filename)?;
        Self::from_toml_str(&config_str)
    }

    pub fn default_config() -> Result<Config> {
        Self::from_file(&Self::find_conf()?)
    }
}
