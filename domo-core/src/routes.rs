//! API route constants
//!
//! Kept in one place so the dispatcher can recognize the sign-in and
//! renewal routes it must treat specially.

pub mod auth {
    pub const LOGIN: &str = "/v1/auth/login";
    pub const LOGOUT: &str = "/v1/auth/logout";
    pub const REFRESH: &str = "/v1/auth/refresh-token";
    pub const ME: &str = "/v1/auth/me";
    pub const PROFILE: &str = "/v1/auth/profile";
    pub const CHANGE_PASSWORD: &str = "/v1/auth/change-password";
}

pub const USERS: &str = "/v1/users";
pub const ROLES: &str = "/v1/roles";
pub const PERMISSIONS: &str = "/v1/permissions";
pub const DEVICES: &str = "/v1/devices";
pub const OVERVIEW: &str = "/v1/overview";

pub fn user(id: &str) -> String {
    format!("{USERS}/{id}")
}

pub fn role(id: &str) -> String {
    format!("{ROLES}/{id}")
}

pub fn device_light(device_id: &str) -> String {
    format!("/v1/mqtt/devices/{device_id}/light")
}

pub fn device_door(device_id: &str) -> String {
    format!("/v1/mqtt/devices/{device_id}/door")
}

pub fn room_detail(location: &str) -> String {
    format!("{OVERVIEW}/rooms/{location}")
}
