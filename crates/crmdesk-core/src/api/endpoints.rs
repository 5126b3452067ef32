//! Fixed table of backend operations.

use std::fmt;

use reqwest::Method;

/// Server-side record collections with CRUD endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Clients,
    Invoices,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Clients => "/clients",
            Resource::Invoices => "/invoices",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path()[1..])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Register,
    Login,
    Logout,
    Me,
    ResetPassword,
    List(Resource),
    Get(Resource, String),
    Create(Resource),
    Update(Resource, String),
    Delete(Resource, String),
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Register
            | Endpoint::Login
            | Endpoint::Logout
            | Endpoint::ResetPassword
            | Endpoint::Create(_) => Method::POST,
            Endpoint::Me | Endpoint::List(_) | Endpoint::Get(..) => Method::GET,
            Endpoint::Update(..) => Method::PUT,
            Endpoint::Delete(..) => Method::DELETE,
        }
    }

    /// Request path with the record id interpolated verbatim.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Register => "/register".to_string(),
            Endpoint::Login => "/login".to_string(),
            Endpoint::Logout => "/logout".to_string(),
            Endpoint::Me => "/me".to_string(),
            Endpoint::ResetPassword => "/reset-password".to_string(),
            Endpoint::List(resource) | Endpoint::Create(resource) => resource.path().to_string(),
            Endpoint::Get(resource, id)
            | Endpoint::Update(resource, id)
            | Endpoint::Delete(resource, id) => format!("{}/{}", resource.path(), id),
        }
    }

    pub fn sends_body(&self) -> bool {
        matches!(
            self,
            Endpoint::Register
                | Endpoint::Login
                | Endpoint::ResetPassword
                | Endpoint::Create(_)
                | Endpoint::Update(..)
        )
    }
}
