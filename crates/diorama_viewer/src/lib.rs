pub mod app;
pub mod placeholders;
pub mod renderer;
