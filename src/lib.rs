pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod error_handling;
pub mod lobby;
pub mod network;
pub mod reporting;
pub mod session_management;
pub mod storage;
