//! Debug toolbar Tower service
//!
//! Wraps an inner HTTP service and drives the toolbar lifecycle around it:
//! attach and startup before the inner call, `before_redirect` for 3xx
//! responses and `before_render` otherwise. On render the gathered
//! [`ToolbarVars`](crate::toolbar::ToolbarVars) are stored in the response
//! extensions.
//!
//! Without debug mode or force-enable, requests go straight to the inner
//! service and no context is built.

use crate::config::{DebugKitConfig, SettingsOverrides};
use crate::context::{RequestInfo, SessionData, TOOLBAR_CONTEXT, ToolbarContext};
use crate::history::CacheBackend;
use crate::panels::PanelRegistry;
use crate::toolbar::{TIMER_CONTROLLER_RENDER, Toolbar};
use futures::future::BoxFuture;
use http::{Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Service produced by [`DebugToolbarLayer`](crate::middleware::DebugToolbarLayer).
#[derive(Clone)]
pub struct DebugToolbarService<S> {
	pub(crate) inner: S,
	/// Debug mode or force-enable; when off, requests are forwarded untouched.
	pub(crate) active: bool,
	pub(crate) config: Arc<DebugKitConfig>,
	pub(crate) overrides: Arc<SettingsOverrides>,
	pub(crate) registry: Arc<PanelRegistry>,
	pub(crate) backend: Arc<dyn CacheBackend>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DebugToolbarService<S>
where
	S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
	S::Future: Send + 'static,
	S::Error: Send + 'static,
	ReqBody: Send + 'static,
	ResBody: Send + 'static,
{
	type Response = Response<ResBody>;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
		// The clone may not be ready; keep the polled service for this call.
		let clone = self.inner.clone();
		let mut inner = std::mem::replace(&mut self.inner, clone);
		if !self.active {
			return Box::pin(inner.call(request));
		}
		let config = self.config.clone();
		let overrides = self.overrides.clone();
		let registry = self.registry.clone();
		let backend = self.backend.clone();

		Box::pin(async move {
			let ctx = Arc::new(ToolbarContext::new(RequestInfo::from_http(&request)));
			if let Some(SessionData(session)) = request.extensions().get::<SessionData>() {
				ctx.set_session(session.clone());
			}
			request.extensions_mut().insert(Arc::clone(&ctx));

			let attachment = Toolbar::attach(&config, &overrides, &ctx, &registry, backend).await;
			let Some(mut toolbar) = attachment.into_toolbar() else {
				return inner.call(request).await;
			};

			toolbar.startup(&ctx).await;

			let mut response = TOOLBAR_CONTEXT
				.scope(Arc::clone(&ctx), inner.call(request))
				.await?;

			if response.status().is_redirection() {
				let vars = toolbar.before_redirect(&ctx).await;
				tracing::debug!(
					status = response.status().as_u16(),
					panels = vars.len(),
					"debug toolbar recorded redirect"
				);
			} else {
				let vars = toolbar.before_render(&ctx).await;
				response.extensions_mut().insert(vars);
				ctx.timer.stop(TIMER_CONTROLLER_RENDER);
			}

			tracing::debug!(
				method = %ctx.request.method,
				path = %ctx.request.path,
				elapsed_ms = ctx.timer.request_elapsed().as_secs_f64() * 1000.0,
				"debug toolbar request finished"
			);
			Ok(response)
		})
	}
}
