pub mod bootstrap;

pub use bootstrap::{
    client_config, poller_settings, resolve_devices, serve_until, start_pollers, Service,
};
