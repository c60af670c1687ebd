//! Route registry and dispatch.

use crate::context::ExecutionContext;
use crate::error::RouterError;
use crate::handler::{ActionHandler, ExecutionOutcome};
use crate::route::RouteKey;
use agora_store::WriteBatch;
use agora_types::GroupId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

struct RouteEntry {
    handler: Box<dyn ActionHandler>,
    /// `None` accepts proposals from any group.
    eligible_groups: Option<BTreeSet<GroupId>>,
}

/// Collects route registrations while the application is composed.
#[derive(Default)]
pub struct RouterBuilder {
    routes: BTreeMap<RouteKey, RouteEntry>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `route` to `handler`, open to proposals from any group.
    pub fn register(
        &mut self,
        route: RouteKey,
        handler: impl ActionHandler + 'static,
    ) -> Result<&mut Self, RouterError> {
        self.insert(route, Box::new(handler), None)
    }

    /// Bind `route` to `handler`, accepting proposals only from `groups`.
    pub fn register_for_groups(
        &mut self,
        route: RouteKey,
        handler: impl ActionHandler + 'static,
        groups: impl IntoIterator<Item = GroupId>,
    ) -> Result<&mut Self, RouterError> {
        let groups = groups.into_iter().collect();
        self.insert(route, Box::new(handler), Some(groups))
    }

    fn insert(
        &mut self,
        route: RouteKey,
        handler: Box<dyn ActionHandler>,
        eligible_groups: Option<BTreeSet<GroupId>>,
    ) -> Result<&mut Self, RouterError> {
        if self.routes.contains_key(&route) {
            return Err(RouterError::DuplicateRoute(route));
        }
        debug!(route = %route, restricted = eligible_groups.is_some(), "registered route");
        self.routes.insert(
            route,
            RouteEntry {
                handler,
                eligible_groups,
            },
        );
        Ok(self)
    }

    /// Freeze the registrations.
    pub fn build(self) -> ActionRouter {
        ActionRouter {
            routes: self.routes,
        }
    }
}

/// Frozen mapping from route key to handler capability.
///
/// Built once by [`RouterBuilder`]; there is no way to add or remove routes
/// afterwards.
pub struct ActionRouter {
    routes: BTreeMap<RouteKey, RouteEntry>,
}

impl ActionRouter {
    /// A router with no routes.
    pub fn empty() -> Self {
        RouterBuilder::new().build()
    }

    /// Whether `route` has a handler.
    pub fn contains(&self, route: &RouteKey) -> bool {
        self.routes.contains_key(route)
    }

    /// Bound route keys, sorted.
    pub fn routes(&self) -> Vec<&RouteKey> {
        self.routes.keys().collect()
    }

    /// Whether `group` may propose actions on `route`.
    pub fn is_eligible(&self, route: &RouteKey, group: &GroupId) -> Result<bool, RouterError> {
        let entry = self.entry(route)?;
        Ok(entry
            .eligible_groups
            .as_ref()
            .map_or(true, |groups| groups.contains(group)))
    }

    /// Run the handler's pre-vote validation of `payload`.
    pub fn check(
        &self,
        route: &RouteKey,
        ctx: &ExecutionContext,
        payload: &[u8],
    ) -> Result<(), RouterError> {
        let entry = self.entry(route)?;
        if !self.is_eligible(route, &ctx.group)? {
            return Err(RouterError::IneligibleGroup {
                route: route.clone(),
                group: ctx.group.clone(),
            });
        }
        entry
            .handler
            .check(ctx, payload)
            .map_err(|failure| RouterError::ActionRejected {
                route: route.clone(),
                reason: failure.reason().to_string(),
            })
    }

    /// Execute `payload` with the handler bound to `route`.
    ///
    /// Writes the handler stages are appended to `batch` only if it applied
    /// the action. The handler's verdict is returned unchanged; only an
    /// unbound route is an error.
    pub fn dispatch(
        &self,
        route: &RouteKey,
        ctx: &ExecutionContext,
        payload: &[u8],
        batch: &mut WriteBatch,
    ) -> Result<ExecutionOutcome, RouterError> {
        let entry = self.entry(route)?;
        let mut staged = WriteBatch::new();
        let outcome = ExecutionOutcome::from(entry.handler.execute(ctx, payload, &mut staged));
        if outcome.is_applied() {
            batch.append(staged);
        }
        match &outcome {
            ExecutionOutcome::Applied => {
                debug!(route = %route, proposal = %ctx.proposal_id, "action applied")
            }
            ExecutionOutcome::Failed { reason } => {
                warn!(route = %route, proposal = %ctx.proposal_id, %reason, "action failed")
            }
        }
        Ok(outcome)
    }

    fn entry(&self, route: &RouteKey) -> Result<&RouteEntry, RouterError> {
        self.routes
            .get(route)
            .ok_or_else(|| RouterError::RouteNotFound(route.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ExecutionFailure;
    use agora_types::{Address, BlockHeight, ProposalId};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicU32>);

    impl ActionHandler for Counting {
        fn execute(
            &self,
            _ctx: &ExecutionContext,
            payload: &[u8],
            batch: &mut WriteBatch,
        ) -> Result<(), ExecutionFailure> {
            self.0.fetch_add(1, Ordering::SeqCst);
            batch.put_meta("counting", payload.to_vec());
            Ok(())
        }
    }

    struct Refusing;

    impl ActionHandler for Refusing {
        fn check(&self, _ctx: &ExecutionContext, payload: &[u8]) -> Result<(), ExecutionFailure> {
            if payload.is_empty() {
                Err(ExecutionFailure::new("empty payload"))
            } else {
                Ok(())
            }
        }

        fn execute(
            &self,
            _ctx: &ExecutionContext,
            payload: &[u8],
            batch: &mut WriteBatch,
        ) -> Result<(), ExecutionFailure> {
            batch.put_meta("treasury", payload.to_vec());
            Err(ExecutionFailure::new("treasury is locked"))
        }
    }

    fn route(key: &str) -> RouteKey {
        RouteKey::parse(key).unwrap()
    }

    fn ctx(group: GroupId) -> ExecutionContext {
        ExecutionContext {
            proposal_id: ProposalId::FIRST,
            proposer: Address::new("agr_alice"),
            group,
            height: BlockHeight::new(10),
        }
    }

    #[test]
    fn duplicate_route_rejected() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut builder = RouterBuilder::new();
        builder.register(route("mod-x"), Counting(calls.clone())).unwrap();
        let err = builder
            .register(route("mod-x"), Counting(calls))
            .err()
            .unwrap();
        assert_eq!(err, RouterError::DuplicateRoute(route("mod-x")));
    }

    #[test]
    fn dispatch_invokes_bound_handler() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut builder = RouterBuilder::new();
        builder.register(route("mod-x"), Counting(calls.clone())).unwrap();
        let router = builder.build();

        let mut batch = WriteBatch::new();
        let outcome = router
            .dispatch(&route("mod-x"), &ctx(GroupId::from_sequence(1)), b"payload", &mut batch)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn dispatch_unbound_route_fails() {
        let router = ActionRouter::empty();
        let err = router
            .dispatch(&route("nowhere"), &ctx(GroupId::from_sequence(1)), b"", &mut WriteBatch::new())
            .unwrap_err();
        assert_eq!(err, RouterError::RouteNotFound(route("nowhere")));
    }

    #[test]
    fn handler_failure_is_returned_and_its_writes_dropped() {
        let mut builder = RouterBuilder::new();
        builder.register(route("treasury"), Refusing).unwrap();
        let router = builder.build();

        let mut batch = WriteBatch::new();
        let outcome = router
            .dispatch(&route("treasury"), &ctx(GroupId::from_sequence(1)), b"spend", &mut batch)
            .unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                reason: "treasury is locked".to_string()
            }
        );
        // Writes staged before the failure are dropped.
        assert!(batch.is_empty());
    }

    #[test]
    fn check_runs_handler_validation() {
        let mut builder = RouterBuilder::new();
        builder.register(route("treasury"), Refusing).unwrap();
        let router = builder.build();
        let c = ctx(GroupId::from_sequence(1));

        assert!(router.check(&route("treasury"), &c, b"spend").is_ok());
        assert!(matches!(
            router.check(&route("treasury"), &c, b""),
            Err(RouterError::ActionRejected { .. })
        ));
    }

    #[test]
    fn restricted_route_checks_group_eligibility() {
        let calls = Arc::new(AtomicU32::new(0));
        let council = GroupId::from_sequence(1);
        let outsiders = GroupId::from_sequence(2);
        let mut builder = RouterBuilder::new();
        builder
            .register_for_groups(route("upgrade"), Counting(calls), [council.clone()])
            .unwrap();
        let router = builder.build();

        assert!(router.is_eligible(&route("upgrade"), &council).unwrap());
        assert!(!router.is_eligible(&route("upgrade"), &outsiders).unwrap());
        assert!(matches!(
            router.check(&route("upgrade"), &ctx(outsiders), b"v2"),
            Err(RouterError::IneligibleGroup { .. })
        ));
    }

    #[test]
    fn routes_are_sorted() {
        let mut builder = RouterBuilder::new();
        builder.register(route("zeta"), Refusing).unwrap();
        builder.register(route("alpha"), Refusing).unwrap();
        let router = builder.build();
        let keys: Vec<&str> = router.routes().iter().map(|r| r.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
