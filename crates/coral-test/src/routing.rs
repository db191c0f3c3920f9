//! Recording routing double
//!
//! Every call the node makes is appended to a shared log, so a test can
//! hand the double to the node and still inspect what happened.

use std::sync::Arc;

use parking_lot::Mutex;

use coral_core::{
    CoralError, CoralResult, DefaultRoute, InstanceConfig, InstanceHandle, RouteEntry, Routing,
};

/// One call into the routing layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingCall {
    Instance,
    Configure(InstanceHandle, InstanceConfig),
    Repair(InstanceHandle),
}

/// Routing layer that records calls and answers from fixed state
#[derive(Clone, Default)]
pub struct RecordingRouting {
    instance: Option<InstanceHandle>,
    default_route: Option<DefaultRoute>,
    routes: Vec<RouteEntry>,
    fail_repairs: bool,
    calls: Arc<Mutex<Vec<RoutingCall>>>,
}

impl RecordingRouting {
    /// A joined node with the given instance
    pub fn joined(instance: u8) -> Self {
        RecordingRouting {
            instance: Some(InstanceHandle(instance)),
            ..Default::default()
        }
    }

    /// A node that has not joined any instance
    pub fn detached() -> Self {
        RecordingRouting::default()
    }

    pub fn with_default_route(mut self, route: DefaultRoute) -> Self {
        self.default_route = Some(route);
        self
    }

    pub fn with_route(mut self, route: RouteEntry) -> Self {
        self.routes.push(route);
        self
    }

    /// Make every repair request fail
    pub fn failing_repairs(mut self) -> Self {
        self.fail_repairs = true;
        self
    }

    /// Snapshot of the call log
    pub fn calls(&self) -> Vec<RoutingCall> {
        self.calls.lock().clone()
    }

    pub fn repairs(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, RoutingCall::Repair(_)))
            .count()
    }

    fn record(&self, call: RoutingCall) {
        self.calls.lock().push(call);
    }
}

impl Routing for RecordingRouting {
    fn instance(&self) -> Option<InstanceHandle> {
        self.record(RoutingCall::Instance);
        self.instance
    }

    fn configure_instance(
        &mut self,
        instance: InstanceHandle,
        config: InstanceConfig,
    ) -> CoralResult<()> {
        self.record(RoutingCall::Configure(instance, config));
        Ok(())
    }

    fn repair(&mut self, instance: InstanceHandle) -> CoralResult<()> {
        self.record(RoutingCall::Repair(instance));
        if self.fail_repairs {
            return Err(CoralError::RepairFailed("no parent".into()));
        }
        Ok(())
    }

    fn default_route(&self) -> Option<DefaultRoute> {
        self.default_route.clone()
    }

    fn routes(&self) -> Vec<RouteEntry> {
        self.routes.clone()
    }
}
