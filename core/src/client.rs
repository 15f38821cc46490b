//! Route assembly and submission for one provider.
//!
//! # Design
//! `ApiClient` pairs a `Provider` with a `Session`. Assembly is split from
//! dispatch: `prepare` turns a `Route` into a `DraftRequest` without any I/O,
//! `submit` does the same and hands the result to the session. Both run the
//! same steps in the same order:
//!
//! 1. resolve the route path against the provider's base URL
//! 2. merge provider and route parameters and headers (route wins)
//! 3. write parameters, either as a multipart form or with the route's
//!    encoding (falling back to the provider default for the method)
//! 4. set the method and apply the merged headers one by one
//!
//! A failure in 1 or 3 never reaches the transport; `submit` returns a
//! handle that completes with the error instead.

use std::sync::Arc;

use url::Url;

use crate::error::ApiError;
use crate::http::DraftRequest;
use crate::params::{merge_headers, merge_params};
use crate::provider::Provider;
use crate::request::RequestHandle;
use crate::route::Route;
use crate::session::Session;

pub struct ApiClient<P> {
    provider: Arc<P>,
    session: Session,
}

impl<P> Clone for ApiClient<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            session: self.session.clone(),
        }
    }
}

impl<P: Provider + 'static> ApiClient<P> {
    pub fn new(provider: P, session: Session) -> Self {
        Self {
            provider: Arc::new(provider),
            session,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Assemble the request for `route` without sending it.
    pub fn prepare(&self, route: &Route) -> Result<DraftRequest, ApiError> {
        let mut request = DraftRequest::new(route.method(), self.resolve_url(route)?);
        self.assemble(route, &mut request)?;
        Ok(request)
    }

    /// Assemble and send `route`. Never blocks on the network.
    pub fn submit(&self, route: &Route) -> RequestHandle {
        let provider: Arc<dyn Provider> = self.provider.clone();
        let mut request = match self.resolve_url(route) {
            Ok(url) => DraftRequest::new(route.method(), url),
            Err(error) => return RequestHandle::rejected(Some(provider), None, error),
        };
        if let Err(error) = self.assemble(route, &mut request) {
            return RequestHandle::rejected(Some(provider), Some(request), error);
        }
        self.session.dispatch(provider, request)
    }

    /// Append the route path to the base URL as path segments.
    fn resolve_url(&self, route: &Route) -> Result<Url, ApiError> {
        let base = self.provider.base_url();
        let path = route.path().trim_start_matches('/');
        if path.is_empty() {
            return Ok(base.clone());
        }

        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::InvalidUrlError(format!("{base} cannot be a base URL")))?;
            segments.pop_if_empty().extend(path.split('/'));
        }
        Ok(url)
    }

    fn assemble(&self, route: &Route, request: &mut DraftRequest) -> Result<(), ApiError> {
        let params = merge_params(&self.provider.additional_params(), route.params());
        let headers = merge_headers(&self.provider.additional_headers(), route.headers());

        match route.multipart() {
            Some(form) => form.encode(request, &params),
            None => {
                let encoding = route
                    .encoding()
                    .unwrap_or_else(|| self.provider.default_encoding(route.method()));
                encoding.encode(request, &params)?;
            }
        }

        request.method = route.method();
        for (name, value) in &headers {
            request.set_header(name, value);
        }
        Ok(())
    }
}
