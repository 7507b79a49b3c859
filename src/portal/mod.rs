//! Client half of the employee portal: route table, navigation guard and
//! reactive session state fed by the auth client.

pub mod client;
pub mod guard;
pub mod routes;
pub mod state;

pub use client::{Auth, AuthClient, AuthSession, ClientError};
pub use guard::{before_each, Navigation, SessionSource};
pub use routes::{Route, RouteTable, LOGIN_PATH};
pub use state::{AuthEvent, AuthState};
