//! domo-api: Typed endpoint services for the domo hub
//!
//! Thin wrappers over [`domo_core::ApiClient`]: each service is route
//! constants, wire DTOs, and one method per endpoint. Auth recovery,
//! bearer attachment, and error normalization all happen underneath in
//! the dispatcher; payloads pass through these types unchanged.

pub mod auth;
pub mod devices;
pub mod overview;
pub mod roles;
pub mod rooms;
pub mod users;

pub use auth::AuthService;
pub use devices::DeviceService;
pub use overview::OverviewService;
pub use roles::RoleService;
pub use rooms::{Room, RoomService};
pub use users::UserService;
