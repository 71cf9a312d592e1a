// ABOUTME: Host identity resolution for causeway
// ABOUTME: Canonicalizes hostnames and discovers their service endpoints

pub mod discovery;
pub mod error;
pub mod hostname;

pub use discovery::{
    Discover, DiscoveryClient, LoginService, ServiceEndpoints, LOGIN_SERVICE_ID, WELL_KNOWN_PATH,
};
pub use error::HostError;
pub use hostname::{Hostname, DEFAULT_HOSTNAME};
