pub mod auth;
pub mod dto;
pub mod handlers;
pub mod openapi;
pub mod server;

pub use server::{init_tracing, router, serve};
