pub mod api_handler;
pub mod file_template_store;
pub mod health_handler;
pub mod session;
pub mod template_store;
pub mod text_target;
pub mod trigger_listener;

#[cfg(test)]
mod trigger_listener_test;
