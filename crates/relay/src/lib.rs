//! Alertmanager webhook relay.
//!
//! Receives alert batches over HTTP, delivers them to Telegram chats chosen
//! by severity and escalates critical alerts to the on-call responder by
//! phone.
//!
//! # Architecture
//!
//! - [`alert`] webhook types
//! - [`format`] message text and the reference timezone
//! - [`dispatch`] grouping, delivery and escalation per batch
//! - [`worker`] inline or pooled batch processing
//! - [`commands`] operator commands shared by the API, the bot and the CLI
//! - [`server`] axum router
//! - [`bot`] Telegram command loop
//! - [`config`] environment configuration
//! - [`app`] component wiring

pub mod alert;
pub mod app;
pub mod bot;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod format;
pub mod server;
pub mod worker;

pub use alert::{Alert, AlertBatch, AlertStatus};
pub use app::Relay;
pub use bot::CommandBot;
pub use commands::{Command, CommandError, CommandHandler, CommandReply};
pub use config::Config;
pub use dispatch::{group_alerts, AlertDispatcher, DispatchReport};
pub use format::{format_alert, format_group, ReferenceZone};
pub use server::{build_router, AppState};
pub use worker::{AlertSink, SubmitError, WorkerPool};
