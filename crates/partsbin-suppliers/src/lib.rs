//! Supplier adapters and the machinery around them: the capability-gated
//! contract, the registry, order-file import and compliance validation.

pub mod adapters;
pub mod compliance;
pub mod contract;
pub mod credentials;
pub mod error;
pub mod gated;
pub mod http;
pub mod import;
pub mod registry;

pub use adapters::{BoltDepotAdapter, DigiKeyAdapter, LcscAdapter, MouserAdapter};
pub use compliance::{validate_adapter, validate_registry, AdapterReport, Check, FrameworkReport, Grade};
pub use contract::{facet_for, validate_settings, Facet, OrderImport, PartDetails, PartSearch, SupplierAdapter};
pub use credentials::{CredentialProvider, EnvCredentialProvider, StaticCredentialProvider};
pub use error::{ImportError, RegistryError, SupplierError};
pub use gated::{CapabilityOutcome, EnrichmentOutcome, EnrichmentProgress, EnrichmentReport, GatedSupplier};
pub use http::{HttpSettings, SupplierHttp};
pub use registry::{SupplierDescription, SupplierFactory, SupplierRegistry};
