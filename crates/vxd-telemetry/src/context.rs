//! Request correlation context for tracing spans.

use tracing::Span;
use uuid::Uuid;

/// Correlates a unit of work (one dispatched request, one worker-pool item)
/// across log lines.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, generated once per request.
    pub request_id: Uuid,
    /// The component that owns this context (`"socket"`, `"dispatch"`,
    /// `"worker"`, ...).
    pub component: String,
    /// The operation being performed, if set.
    pub operation: Option<String>,
}

impl RequestContext {
    /// Start a context for `component` with a fresh correlation id.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            component: component.into(),
            operation: None,
        }
    }

    /// Attach an operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Build the tracing span this context should be recorded under.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or("")
        )
    }

    /// Enter the span, returning a guard that exits it on drop.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard { span: self.span() }
    }
}

/// RAII guard keeping a [`RequestContext`]'s span entered.
pub struct RequestGuard {
    span: Span,
}

impl RequestGuard {
    /// Borrow the underlying span.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_operation() {
        let ctx = RequestContext::new("dispatch").with_operation("add_voxel");
        assert_eq!(ctx.component, "dispatch");
        assert_eq!(ctx.operation.as_deref(), Some("add_voxel"));
    }

    #[test]
    fn each_context_gets_a_unique_id() {
        let a = RequestContext::new("x");
        let b = RequestContext::new("x");
        assert_ne!(a.request_id, b.request_id);
    }
}
