//! CLI module - administrative command-line interface for Gatekeeper
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::models::{AccountStatus, KeyStatus, PrincipalKind};

/// Gatekeeper - account security administration
#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of the default search paths
    #[arg(long, global = true, env = "GATEKEEPER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Manage administrators and users
    Principal {
        #[command(subcommand)]
        command: PrincipalCommands,
    },

    /// Manage application keys
    #[command(name = "app-key")]
    AppKey {
        #[command(subcommand)]
        command: AppKeyCommands,
    },

    /// Inspect roles and their policies
    Role {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Lockout bookkeeping
    Lockout {
        #[command(subcommand)]
        command: LockoutCommands,
    },

    /// Run the credential verifier once
    Verify {
        /// Username or email
        identifier: String,
        #[arg(long, default_value = "user")]
        kind: PrincipalKind,
        #[arg(long, env = "GATEKEEPER_APP_KEY")]
        app_key: Option<String>,
        #[arg(long, env = "GATEKEEPER_PASSWORD")]
        password: String,
        /// Source address to attribute the attempt to
        #[arg(long)]
        ip: Option<IpAddr>,
    },
}

#[derive(Subcommand)]
pub enum PrincipalCommands {
    /// Create an administrator or user
    Create {
        username: String,
        email: String,
        #[arg(long, default_value = "user")]
        kind: PrincipalKind,
        #[arg(long, env = "GATEKEEPER_PASSWORD")]
        password: String,
        /// Role name; repeat for several. Defaults to the kind's own role.
        #[arg(long = "role")]
        roles: Vec<String>,
        #[arg(long, default_value = "enabled")]
        status: AccountStatus,
    },
    /// Clear failures and any lock held against a principal
    Unlock {
        /// Username or email
        identifier: String,
        #[arg(long, default_value = "user")]
        kind: PrincipalKind,
    },
    /// Change account status (archive, delete, re-enable)
    SetStatus {
        identifier: String,
        status: AccountStatus,
        #[arg(long, default_value = "user")]
        kind: PrincipalKind,
    },
}

#[derive(Subcommand)]
pub enum AppKeyCommands {
    /// Generate a key for an application
    Create {
        application: String,
        #[arg(long, default_value = "enabled")]
        status: KeyStatus,
    },
    /// List all keys
    #[command(alias = "ls")]
    List,
    /// Change the status of a key
    SetStatus { key: String, status: KeyStatus },
}

#[derive(Subcommand)]
pub enum RoleCommands {
    /// List roles with their lockout and password policies
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
pub enum LockoutCommands {
    /// Drop stale failure records and expired locks
    Prune,
    /// Clear failures and any lock held against a source address
    UnlockIp { ip: IpAddr },
}

pub use commands::*;
