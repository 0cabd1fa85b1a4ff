//! Churn predictor web application
//!
//! Serves the prediction form, a JSON inference endpoint and the
//! health/metrics endpoints on top of `predictor-lib`.

pub mod api;
pub mod config;
pub mod web;
