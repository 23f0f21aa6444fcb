// Security module for request authentication
//
// Authentication is a pluggable capability: resources that need it mark
// their mutating routes protected, and the server asks the configured
// Authenticator to turn request credentials into a Principal.

pub mod authenticator;

pub use authenticator::{
    AuthError, Authenticator, BasicAuthenticator, Credentials, OpenAuthenticator, Principal,
    TokenAuthenticator, authenticator_from_config,
};
