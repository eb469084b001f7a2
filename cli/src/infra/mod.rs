//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! `aws` CLI adapter, SSH, and environment configuration.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod aws_cli;
pub mod command_runner;
pub mod config;
pub mod ssh;
