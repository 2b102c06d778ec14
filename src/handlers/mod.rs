pub mod answer;
pub mod health;
pub mod logs;
pub mod metrics_handler;
