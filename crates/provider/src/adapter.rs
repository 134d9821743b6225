use async_trait::async_trait;
use llmgw_core::{Request, Response, VendorError};

/// Strongly-typed adapter trait with native `async fn`.
///
/// This trait is **not** object-safe because it uses native `async fn`
/// methods (which desugar to opaque `impl Future` return types). If you need
/// dynamic dispatch, use [`DynAdapter`] instead -- every `Adapter`
/// automatically implements `DynAdapter` via a blanket implementation.
pub trait Adapter: Send + Sync {
    /// Returns the unique vendor name this adapter serves (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Send `request` to the vendor and return a normalized [`Response`].
    fn complete(
        &self,
        request: &Request,
    ) -> impl std::future::Future<Output = Result<Response, VendorError>> + Send;

    /// Perform a lightweight health check against the vendor endpoint.
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), VendorError>> + Send;

    /// Whether this adapter can service grounded (web-search) requests.
    fn supports_grounding(&self) -> bool {
        true
    }
}

/// Object-safe adapter trait for use behind `Arc<dyn DynAdapter>`.
///
/// Uses [`macro@async_trait`] to enable dynamic dispatch of async methods.
/// You generally should not implement this trait directly -- instead
/// implement [`Adapter`] and rely on the blanket implementation.
#[async_trait]
pub trait DynAdapter: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &Request) -> Result<Response, VendorError>;

    async fn health_check(&self) -> Result<(), VendorError>;

    fn supports_grounding(&self) -> bool {
        true
    }
}

/// Blanket implementation: any type that implements [`Adapter`] also
/// implements [`DynAdapter`], bridging the static and dynamic dispatch worlds.
#[async_trait]
impl<T: Adapter + Sync> DynAdapter for T {
    fn name(&self) -> &str {
        Adapter::name(self)
    }

    async fn complete(&self, request: &Request) -> Result<Response, VendorError> {
        Adapter::complete(self, request).await
    }

    async fn health_check(&self) -> Result<(), VendorError> {
        Adapter::health_check(self).await
    }

    fn supports_grounding(&self) -> bool {
        Adapter::supports_grounding(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use llmgw_core::{Message, Response, ResponseMeta, Usage};

    use super::*;

    struct MockAdapter {
        vendor_name: String,
        should_fail: bool,
    }

    impl Adapter for MockAdapter {
        fn name(&self) -> &str {
            &self.vendor_name
        }

        async fn complete(&self, _request: &Request) -> Result<Response, VendorError> {
            if self.should_fail {
                return Err(VendorError::UpstreamUnavailable("mock failure".into()));
            }
            Ok(Response {
                content: "ok".into(),
                success: true,
                model_version: "mock-1".into(),
                vendor: self.vendor_name.clone(),
                grounded_effective: false,
                usage: Usage::default(),
                latency_ms: 1,
                citations: Vec::new(),
                metadata: ResponseMeta::default(),
            })
        }

        async fn health_check(&self) -> Result<(), VendorError> {
            if self.should_fail {
                return Err(VendorError::UpstreamUnavailable("mock unhealthy".into()));
            }
            Ok(())
        }
    }

    fn sample_request() -> Request {
        Request::new("mock-1", vec![Message::user("hello")])
    }

    #[tokio::test]
    async fn adapter_complete_success() {
        let adapter = MockAdapter {
            vendor_name: "mock".into(),
            should_fail: false,
        };
        let resp = Adapter::complete(&adapter, &sample_request()).await.unwrap();
        assert!(resp.success);
    }

    #[tokio::test]
    async fn adapter_complete_failure() {
        let adapter = MockAdapter {
            vendor_name: "mock".into(),
            should_fail: true,
        };
        let err = Adapter::complete(&adapter, &sample_request()).await.unwrap_err();
        assert!(matches!(err, VendorError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn blanket_dyn_adapter_impl() {
        let adapter: Arc<dyn DynAdapter> = Arc::new(MockAdapter {
            vendor_name: "dyn-mock".into(),
            should_fail: false,
        });
        assert_eq!(adapter.name(), "dyn-mock");
        let resp = adapter.complete(&sample_request()).await.unwrap();
        assert!(resp.success);
        adapter.health_check().await.unwrap();
    }
}
