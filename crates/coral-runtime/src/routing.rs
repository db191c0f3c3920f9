//! Static routing collaborator
//!
//! Stands in for the mesh routing layer on hosts that have none: the
//! route table comes from configuration, startup parameters are recorded
//! and repair requests are only counted and logged.

use coral_core::{
    CoralError, CoralResult, DefaultRoute, InstanceConfig, InstanceHandle, RouteEntry, Routing,
};

use crate::config::RoutingConfig;

#[derive(Clone, Debug, Default)]
pub struct StaticRouting {
    instance: Option<InstanceHandle>,
    default_route: Option<DefaultRoute>,
    routes: Vec<RouteEntry>,
    applied: Option<InstanceConfig>,
    repairs: u64,
}

impl StaticRouting {
    pub fn new(instance: Option<u8>) -> Self {
        StaticRouting {
            instance: instance.map(InstanceHandle),
            ..Default::default()
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        StaticRouting {
            instance: config.instance.map(InstanceHandle),
            default_route: config.default_route.as_ref().map(|d| DefaultRoute {
                via: d.via,
                lifetime: d.lifetime,
                infinite: d.infinite,
            }),
            routes: config
                .routes
                .iter()
                .map(|r| RouteEntry {
                    destination: r.destination,
                    next_hop: r.next_hop,
                    lifetime: r.lifetime,
                })
                .collect(),
            applied: None,
            repairs: 0,
        }
    }

    /// Parameters applied by the last `configure_instance` call
    pub fn applied(&self) -> Option<InstanceConfig> {
        self.applied
    }

    pub fn repairs(&self) -> u64 {
        self.repairs
    }

    fn check(&self, instance: InstanceHandle) -> CoralResult<()> {
        match self.instance {
            Some(own) if own == instance => Ok(()),
            _ => Err(CoralError::RoutingUnavailable),
        }
    }
}

impl Routing for StaticRouting {
    fn instance(&self) -> Option<InstanceHandle> {
        self.instance
    }

    fn configure_instance(
        &mut self,
        instance: InstanceHandle,
        config: InstanceConfig,
    ) -> CoralResult<()> {
        self.check(instance)?;
        tracing::debug!(
            instance = %instance,
            color = config.color.name(),
            dio_doublings = config.dio_doublings,
            "static routing configured"
        );
        self.applied = Some(config);
        Ok(())
    }

    fn repair(&mut self, instance: InstanceHandle) -> CoralResult<()> {
        self.check(instance)?;
        self.repairs += 1;
        tracing::info!(instance = %instance, "static routing has no DAG to repair");
        Ok(())
    }

    fn default_route(&self) -> Option<DefaultRoute> {
        self.default_route.clone()
    }

    fn routes(&self) -> Vec<RouteEntry> {
        self.routes.clone()
    }
}
