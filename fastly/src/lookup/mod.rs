//! Read-by-filter lookups
//!
//! Fastly's list endpoints cannot filter server-side, so a lookup pages
//! through everything, keeps the entities matching the user's criteria and
//! then insists on exactly one survivor.

pub mod filter;
pub mod pagination;

pub use filter::{Criteria, TlsCertificateFilter, TlsConfigurationFilter, TlsService};
pub use pagination::{list_all, PageSource, TlsCertificatePages, TlsConfigurationPages};

use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("your query returned no results. Please change your search criteria and try again.")]
    EmptyQuery,

    #[error("your query returned more than one result. Please use a more specific search criteria and try again.")]
    AmbiguousQuery { count: usize },

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error("lookup interrupted: {0}")]
    Interrupted(#[from] tfplug::TfplugError),
}

/// Exactly one match is a result; none or several are errors
pub fn resolve_single<T>(matches: Vec<T>) -> Result<T, LookupError> {
    let count = matches.len();
    let mut iter = matches.into_iter();
    match (iter.next(), count) {
        (Some(only), 1) => Ok(only),
        (None, _) => Err(LookupError::EmptyQuery),
        _ => Err(LookupError::AmbiguousQuery { count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_single_requires_exactly_one() {
        assert!(matches!(
            resolve_single(Vec::<u8>::new()),
            Err(LookupError::EmptyQuery)
        ));
        assert_eq!(resolve_single(vec![7]).unwrap(), 7);
        assert!(matches!(
            resolve_single(vec![1, 2, 3]),
            Err(LookupError::AmbiguousQuery { count: 3 })
        ));
    }

    #[test]
    fn resolution_errors_carry_user_facing_messages() {
        assert_eq!(
            LookupError::EmptyQuery.to_string(),
            "your query returned no results. Please change your search criteria and try again."
        );
        assert_eq!(
            LookupError::AmbiguousQuery { count: 2 }.to_string(),
            "your query returned more than one result. Please use a more specific search criteria and try again."
        );
    }
}
