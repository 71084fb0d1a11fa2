pub mod app;
pub mod audio;
pub mod config;
pub mod controller;
pub mod cover;
pub mod model;
pub mod playlist;
pub mod ui;
