//! Typed calls for each route of the access-control backend.
//!
//! `AccessApi` borrows nothing and adds nothing to the wire: every method is
//! one `ConfiguredClient` request with a JSON body in and a JSON body out.
//! Rejections the backend signals with a status (wrong PIN, unknown id,
//! duplicate username) come back as `ClientError::HttpStatus`.

use crate::client::ConfiguredClient;
use crate::error::ClientError;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AccessLog, AccessRequest, AccessResponse, ActionResponse, ApiStatus, AuthCheck, CreateDevice,
    CreateUser, CreateUserResponse, Device, LoginRequest, LoginResponse, UpdateDeviceIp, User,
};

#[derive(Debug, Clone)]
pub struct AccessApi<T = UreqTransport> {
    client: ConfiguredClient<T>,
}

impl<T: Transport> AccessApi<T> {
    pub fn new(client: ConfiguredClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ConfiguredClient<T> {
        &self.client
    }

    pub fn status(&self) -> Result<ApiStatus, ClientError> {
        self.client.get_json("/status/")
    }

    pub fn check_auth(&self) -> Result<AuthCheck, ClientError> {
        self.client.get_json("/check-auth/")
    }

    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.client.post_json("/login/", &body)
    }

    pub fn verify_access(&self, pin: &str) -> Result<AccessResponse, ClientError> {
        let body = AccessRequest { pin: pin.to_string() };
        self.client.post_json("/access/verify/", &body)
    }

    pub fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.client.get_json("/users/")
    }

    pub fn create_user(&self, input: &CreateUser) -> Result<CreateUserResponse, ClientError> {
        self.client.post_json("/users/create/", input)
    }

    pub fn delete_user(&self, id: u64) -> Result<ActionResponse, ClientError> {
        self.client.delete_json(&format!("/users/{id}/delete/"))
    }

    /// Newest first.
    pub fn list_logs(&self) -> Result<Vec<AccessLog>, ClientError> {
        self.client.get_json("/logs/")
    }

    pub fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        self.client.get_json("/devices/")
    }

    pub fn create_device(&self, input: &CreateDevice) -> Result<Device, ClientError> {
        self.client.post_json("/devices/create/", input)
    }

    pub fn delete_device(&self, id: u64) -> Result<ActionResponse, ClientError> {
        self.client.delete_json(&format!("/devices/{id}/delete/"))
    }

    pub fn update_device_ip(&self, id: u64, ip_address: &str) -> Result<Device, ClientError> {
        let body = UpdateDeviceIp {
            ip_address: ip_address.to_string(),
        };
        self.client.put_json(&format!("/devices/{id}/update-ip/"), &body)
    }
}
