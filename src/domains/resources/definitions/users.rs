//! User accounts resource definition.

use super::{ResourceDefinition, ResourceOptions};
use crate::domains::store::{FieldKind, FieldSpec, Schema};

/// User accounts. Usernames are unique; writes need credentials.
pub struct UsersResource;

impl ResourceDefinition for UsersResource {
    const NAME: &'static str = "users";
    const DESCRIPTION: &'static str = "User accounts with unique usernames";

    fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::required("username", FieldKind::String).unique())
            .field(FieldSpec::required("email", FieldKind::String))
            .search_on("username")
    }

    fn options() -> ResourceOptions {
        ResourceOptions {
            protected: true,
            ..Default::default()
        }
    }
}
