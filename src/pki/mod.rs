//! Certificate material handling: CSR validation on the way in, trust
//! bundle assembly on the way out. Everything here is synchronous and
//! in-memory.

pub mod bundle;
pub mod csr;

pub use bundle::{assemble, SignedCertificate, TrustBundle};
pub use csr::Csr;
