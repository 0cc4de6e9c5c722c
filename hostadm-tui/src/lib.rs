pub mod dispatcher;
pub mod engine;
pub mod input;
pub mod message;
pub mod router;
pub mod sampler;
pub mod screen;
pub mod screens;
pub mod theme;
