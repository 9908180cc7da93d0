pub mod app;
pub mod bias;
pub mod config;
pub mod data;
pub mod density;
pub mod logging;
pub mod playback;
pub mod render;
pub mod selection;
pub mod timeline;
pub mod views;
