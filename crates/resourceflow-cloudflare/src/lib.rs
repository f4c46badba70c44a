//! Cloudflare DNS records for resourceflow
//!
//! DNS changes are synchronous on Cloudflare's side, so every record the
//! API returns is already `ACTIVE`; the engine's stabilize stage settles on
//! its first read.

pub mod dns;
pub mod error;
pub mod translator;

pub use dns::{CloudflareDns, DnsConfig, DnsRecord, DnsRequest, DnsResponse, RecordBody};
pub use error::{CloudflareError, Result};
pub use translator::{DnsRecordSpec, DnsRecordState, DnsRecordTranslator};
