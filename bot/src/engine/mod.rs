pub mod bootstrap;
pub mod channel_resolver;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod models;
pub mod permissions;
pub mod reconfigure;
pub mod state;
pub mod topic_config;
pub mod webhook_sync;
