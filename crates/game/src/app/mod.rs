pub(crate) mod bootstrap;
mod config;
mod console;
mod gateway;
mod http_transport;
pub(crate) mod loop_runner;
mod orchestrator;
mod scripted;
mod village_scene;
mod world_data;
