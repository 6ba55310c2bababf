pub mod demo_camera;
pub mod event_hub;
pub mod mda_runner;
