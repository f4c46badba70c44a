//! Sakura Cloud servers for resourceflow
//!
//! [`Usacloud`] drives the usacloud CLI and implements the engine's
//! `ServiceClient`; [`ServerTranslator`] maps [`ServerSpec`] to usacloud
//! calls and server listings back to [`ServerState`].
//!
//! Server creation is asynchronous: usacloud returns while the disk is
//! still being copied (`Availability: migrating`), and the server only
//! counts as active once it is `available` and powered `up`.

pub mod error;
pub mod translator;
pub mod usacloud;

pub use error::{Result, SakuraError};
pub use translator::{ServerState, ServerTranslator, server_status};
pub use usacloud::{SakuraRequest, SakuraResponse, ServerInfo, ServerSpec, Usacloud};

/// Default Sakura Cloud zone
pub const DEFAULT_ZONE: &str = "tk1a";
