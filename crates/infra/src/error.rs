//! Infrastructure error types and their mapping onto the domain taxonomy.

use thiserror::Error;

use orderkit_core::DomainError;

/// A port call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store rejected or lost the write.
    #[error("write failed: {0}")]
    Write(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The offer oracle could not produce an outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("offer oracle unavailable: {0}")]
    Unavailable(String),

    #[error("offer oracle rejected the cart: {0}")]
    Rejected(String),
}

/// Order-level settlement failure (per-item failures are reported, not raised).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("idempotency ledger lock poisoned")]
    LedgerPoisoned,
}

impl From<PortError> for DomainError {
    fn from(value: PortError) -> Self {
        match value {
            PortError::NotFound(what) => DomainError::NotFound(what),
            PortError::Write(msg) | PortError::Unavailable(msg) => DomainError::Persistence(msg),
        }
    }
}

impl From<OracleError> for DomainError {
    fn from(value: OracleError) -> Self {
        DomainError::Persistence(value.to_string())
    }
}

impl From<SettlementError> for DomainError {
    fn from(value: SettlementError) -> Self {
        match value {
            SettlementError::OrderNotFound(id) => DomainError::not_found(format!("order {id}")),
            SettlementError::Port(err) => err.into(),
            SettlementError::LedgerPoisoned => DomainError::persistence("idempotency ledger lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_onto_domain_taxonomy() {
        assert_eq!(
            DomainError::from(PortError::NotFound("product 1".into())),
            DomainError::NotFound("product 1".into())
        );
        assert!(matches!(
            DomainError::from(PortError::Write("disk full".into())),
            DomainError::Persistence(_)
        ));
        assert!(matches!(
            DomainError::from(SettlementError::OrderNotFound("42".into())),
            DomainError::NotFound(_)
        ));
    }
}
