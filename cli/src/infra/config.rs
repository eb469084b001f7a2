//! Harness configuration loaded from environment variables via `envy`.
//!
//! Two groups, each under its own prefix:
//!   - `AWS_REGION` (required), `AWS_PROFILE` (optional). Access keys are
//!     read by the `aws` process itself and never pass through here.
//!   - `ENI_HARNESS_SSH_HOST` (required), `ENI_HARNESS_SSH_USER`,
//!     `ENI_HARNESS_SSH_KEY`, `ENI_HARNESS_SSH_PORT`, `ENI_HARNESS_NIC`,
//!     `ENI_HARNESS_DEVICE_INDEX`, `ENI_HARNESS_ELASTIC_ADDRESS`,
//!     `ENI_HARNESS_EGRESS_URL`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::checks::DEFAULT_EGRESS_URL;
use crate::domain::interface::{DEFAULT_DEVICE_INDEX, DEFAULT_NIC};

/// Provider settings forwarded to every `aws` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub profile: Option<String>,
}

/// How to reach the instance under test and what to manage on it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HarnessConfig {
    pub ssh_host: String,

    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    /// Identity file passed to `ssh -i`.
    pub ssh_key: Option<PathBuf>,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,

    /// OS name the hotplug rules give the secondary device.
    #[serde(default = "default_nic")]
    pub nic: String,

    #[serde(default = "default_device_index")]
    pub device_index: u32,

    #[serde(default)]
    pub elastic_address: bool,

    #[serde(default = "default_egress_url")]
    pub egress_url: String,
}

fn default_ssh_user() -> String {
    "ec2-user".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_nic() -> String {
    DEFAULT_NIC.to_string()
}

fn default_device_index() -> u32 {
    DEFAULT_DEVICE_INDEX
}

fn default_egress_url() -> String {
    DEFAULT_EGRESS_URL.to_string()
}

impl AwsConfig {
    /// # Errors
    ///
    /// Returns an error if `AWS_REGION` is unset.
    pub fn from_env() -> Result<Self> {
        Self::from_iter(std::env::vars())
    }

    /// Load from an explicit variable list.
    ///
    /// # Errors
    ///
    /// Returns an error if `AWS_REGION` is missing.
    pub fn from_iter(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        envy::prefixed("AWS_")
            .from_iter(vars)
            .context("failed to load AWS settings (AWS_REGION is required)")
    }
}

impl HarnessConfig {
    /// # Errors
    ///
    /// Returns an error if `ENI_HARNESS_SSH_HOST` is unset or a value does
    /// not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_iter(std::env::vars())
    }

    /// Load from an explicit variable list.
    ///
    /// # Errors
    ///
    /// Returns an error if `ENI_HARNESS_SSH_HOST` is missing or a value does
    /// not parse.
    pub fn from_iter(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        envy::prefixed("ENI_HARNESS_")
            .from_iter(vars)
            .context(
                "failed to load harness settings from ENI_HARNESS_* env vars \
                 (ENI_HARNESS_SSH_HOST is required)",
            )
    }
}
