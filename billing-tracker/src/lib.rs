//! billing-tracker: cloud cost records, periodic aggregation, exports,
//! operational checklists and a kanban task board.

pub mod billing;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;
