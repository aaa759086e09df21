//! Page-by-page collection over list endpoints
//!
//! The API does not report a page count, so collection stops at the first
//! empty page. Each page is filtered before it is kept.

use async_trait::async_trait;
use tfplug::Context;

use super::filter::Criteria;
use super::LookupError;
use crate::api::common::PageRequest;
use crate::api::tls::{TlsCertificate, TlsConfiguration, CERTIFICATE_PAGE_SIZE};
use crate::api::{ApiError, Client};

/// A list endpoint addressed by 1-based page number
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, page_number: u32) -> Result<Vec<Self::Item>, ApiError>;
}

/// Collect every entity matching `criteria`, in page order.
/// The first failing page aborts the walk; nothing is retried.
pub async fn list_all<S, C>(
    ctx: &Context,
    source: &S,
    criteria: &C,
) -> Result<Vec<S::Item>, LookupError>
where
    S: PageSource,
    C: Criteria<S::Item> + Sync,
{
    let mut matches = Vec::new();
    let mut page_number = 1;

    // TODO: no upper bound on pages; a server that never returns an empty page loops until cancelled
    loop {
        ctx.ensure_active()?;

        let page = source.fetch_page(page_number).await?;
        if page.is_empty() {
            break;
        }
        tracing::debug!("Fetched page {} with {} items", page_number, page.len());

        matches.extend(page.into_iter().filter(|item| criteria.matches(item)));
        page_number += 1;
    }

    Ok(matches)
}

pub struct TlsCertificatePages<'a> {
    client: &'a Client,
}

impl<'a> TlsCertificatePages<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for TlsCertificatePages<'_> {
    type Item = TlsCertificate;

    async fn fetch_page(&self, page_number: u32) -> Result<Vec<TlsCertificate>, ApiError> {
        self.client
            .tls()
            .list_certificates(PageRequest::new(page_number).with_size(CERTIFICATE_PAGE_SIZE))
            .await
    }
}

/// Uses the server's default page size
pub struct TlsConfigurationPages<'a> {
    client: &'a Client,
}

impl<'a> TlsConfigurationPages<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for TlsConfigurationPages<'_> {
    type Item = TlsConfiguration;

    async fn fetch_page(&self, page_number: u32) -> Result<Vec<TlsConfiguration>, ApiError> {
        self.client
            .tls()
            .list_configurations(PageRequest::new(page_number))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakePages {
        pages: Vec<Vec<u32>>,
        fail_on: Option<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl FakePages {
        fn new(pages: Vec<Vec<u32>>) -> Self {
            Self {
                pages,
                fail_on: None,
                requested: Mutex::new(vec![]),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for FakePages {
        type Item = u32;

        async fn fetch_page(&self, page_number: u32) -> Result<Vec<u32>, ApiError> {
            self.requested.lock().unwrap().push(page_number);
            if self.fail_on == Some(page_number) {
                return Err(ApiError::ServiceUnavailable(503));
            }
            Ok(self
                .pages
                .get(page_number as usize - 1)
                .cloned()
                .unwrap_or_default())
        }
    }

    struct Even;

    impl Criteria<u32> for Even {
        fn matches(&self, n: &u32) -> bool {
            n % 2 == 0
        }
    }

    struct Everything;

    impl Criteria<u32> for Everything {
        fn matches(&self, _: &u32) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn walks_until_first_empty_page() {
        let source = FakePages::new(vec![vec![1, 2], vec![3, 4], vec![5]]);
        let all = list_all(&Context::new(), &source, &Everything).await.unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        assert_eq!(source.requested(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn filters_each_page() {
        let source = FakePages::new(vec![vec![1, 2], vec![3, 4], vec![6]]);
        let evens = list_all(&Context::new(), &source, &Even).await.unwrap();
        assert_eq!(evens, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn empty_first_page_yields_nothing() {
        let source = FakePages::new(vec![]);
        let all = list_all(&Context::new(), &source, &Everything).await.unwrap();
        assert!(all.is_empty());
        assert_eq!(source.requested(), vec![1]);
    }

    #[tokio::test]
    async fn page_error_aborts_without_retry() {
        let mut source = FakePages::new(vec![vec![1], vec![2], vec![3]]);
        source.fail_on = Some(2);

        let err = list_all(&Context::new(), &source, &Everything)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LookupError::Remote(ApiError::ServiceUnavailable(503))
        ));
        assert_eq!(source.requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_fetching() {
        let ctx = Context::new();
        ctx.cancel();
        let source = FakePages::new(vec![vec![1]]);

        let err = list_all(&ctx, &source, &Everything).await.unwrap_err();
        assert!(matches!(err, LookupError::Interrupted(_)));
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn expired_deadline_stops_before_fetching() {
        let ctx = Context::new().with_timeout(std::time::Duration::ZERO);
        let source = FakePages::new(vec![vec![1]]);

        let err = list_all(&ctx, &source, &Everything).await.unwrap_err();
        assert!(matches!(err, LookupError::Interrupted(_)));
        assert!(source.requested().is_empty());
    }
}
