//! Value resolution: conversion plus graph-backed label resolution.
//!
//! Resolving one attribute value either finishes (`Ready`), fails for good
//! (`Failed`), or hits a graph value that is not computed yet (`Suspended`).
//! A suspension abandons the whole tag, not just this attribute: nothing is
//! kept, and the driver re-runs the check from the top once the graph has
//! caught up. The graph memoizes, so the re-run is cheap and this module
//! caches nothing itself.
//!
//! ## Label resolution
//! 1. Baseline options after the exec transition to the host platform
//! 2. The label configured in that configuration
//! 3. For rule targets, the exported providers become the value, and every
//!    action output must be built before the value is ready

use tracing::{debug, trace};

use crate::config::types::ResolverConfig;
use crate::error::ResolutionError;
use crate::graph::{
    BuildConfigurationKey, BuildOptions, ConfiguredTargetKey, ConfiguredTargetValue, GraphError,
    GraphKey, GraphLookup, GraphValue,
};
use crate::label::{Label, LabelConverter};
use crate::location::Location;
use crate::schema::{AllowedValuePredicate, AttributeDescriptor, ConversionError};
use crate::value::{RawValue, TypedValue};

/// Everything resolution reads from outside the tag itself.
#[derive(Clone, Copy)]
pub struct ResolutionEnv<'a> {
    pub graph: &'a dyn GraphLookup,
    pub labels: &'a LabelConverter,
    pub config: &'a ResolverConfig,
}

impl<'a> ResolutionEnv<'a> {
    pub fn new(
        graph: &'a dyn GraphLookup,
        labels: &'a LabelConverter,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            graph,
            labels,
            config,
        }
    }
}

/// The tag a value belongs to, for error messages.
#[derive(Clone, Copy, Debug)]
pub struct TagSite<'a> {
    pub tag_kind: &'a str,
    pub location: &'a Location,
}

/// Result of resolving one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready(TypedValue),
    /// A graph dependency is not computed yet; restart the whole check later
    Suspended,
    Failed(ResolutionError),
}

impl Outcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

impl From<Result<Option<TypedValue>, ResolutionError>> for Outcome {
    fn from(result: Result<Option<TypedValue>, ResolutionError>) -> Self {
        match result {
            Ok(Some(value)) => Self::Ready(value),
            Ok(None) => Self::Suspended,
            Err(e) => Self::Failed(e),
        }
    }
}

pub struct ValueResolver<'a> {
    env: ResolutionEnv<'a>,
}

impl<'a> ValueResolver<'a> {
    pub fn new(env: ResolutionEnv<'a>) -> Self {
        Self { env }
    }

    /// Convert, check allowed values, and resolve labels through the graph.
    pub fn resolve(
        &self,
        raw: &RawValue,
        descriptor: &AttributeDescriptor,
        site: TagSite<'_>,
    ) -> Outcome {
        self.try_resolve(raw, descriptor, site).into()
    }

    fn try_resolve(
        &self,
        raw: &RawValue,
        descriptor: &AttributeDescriptor,
        site: TagSite<'_>,
    ) -> Result<Option<TypedValue>, ResolutionError> {
        let value = self.convert(raw, descriptor, site)?;
        check_allowed(&value, descriptor, site)?;

        match value {
            TypedValue::Label(label) if descriptor.attr_type.is_label() => {
                self.resolve_label(label, descriptor, site)
            }
            other => Ok(Some(other)),
        }
    }

    /// Type conversion only; never touches the graph.
    pub fn convert(
        &self,
        raw: &RawValue,
        descriptor: &AttributeDescriptor,
        site: TagSite<'_>,
    ) -> Result<TypedValue, ResolutionError> {
        descriptor
            .attr_type
            .convert(raw, &descriptor.name, self.env.labels)
            .map_err(|e| conversion_error(e, descriptor, site))
    }

    /// The converted default of an attribute the user left unset. Defaults
    /// are never resolved through the graph.
    pub fn convert_default(
        &self,
        descriptor: &AttributeDescriptor,
        site: TagSite<'_>,
    ) -> Result<TypedValue, ResolutionError> {
        match &descriptor.default {
            Some(raw) => self.convert(raw, descriptor, site),
            None => Ok(descriptor.attr_type.natural_default()),
        }
    }

    fn resolve_label(
        &self,
        label: Label,
        descriptor: &AttributeDescriptor,
        site: TagSite<'_>,
    ) -> Result<Option<TypedValue>, ResolutionError> {
        let config = self.env.config;
        let platform = Label::parse_canonical(&config.host_platform).map_err(|source| {
            ResolutionError::MalformedReference {
                tag_kind: site.tag_kind.to_string(),
                location: site.location.clone(),
                attribute: descriptor.name.clone(),
                source,
            }
        })?;

        let fail = |e: GraphError| graph_error(e, &label, descriptor, site);

        // 1. Baseline configuration
        let options_key = GraphKey::BaselineOptions {
            after_exec_transition: config.after_exec_transition,
            platform,
        };
        let Some(value) = self.query(&options_key).map_err(&fail)? else {
            debug!(attribute = %descriptor.name, key = %options_key, "suspending on baseline options");
            return Ok(None);
        };
        let options = expect_options(value, &options_key).map_err(&fail)?;

        // 2. Configured target
        let target_key = GraphKey::ConfiguredTarget(ConfiguredTargetKey {
            label: label.clone(),
            configuration: BuildConfigurationKey::from_options(&options),
        });
        let Some(value) = self.query(&target_key).map_err(&fail)? else {
            debug!(attribute = %descriptor.name, key = %target_key, "suspending on configured target");
            return Ok(None);
        };
        let target = expect_target(value, &target_key).map_err(&fail)?;

        // 3. Providers, and materialized outputs
        let rule = match target {
            ConfiguredTargetValue::Rule(rule) => rule,
            ConfiguredTargetValue::Other { kind, .. } => {
                trace!(%label, %kind, "non-rule target keeps its label");
                return Ok(Some(TypedValue::Label(label)));
            }
        };

        if config.materialize_outputs {
            // Request every output before giving up, so the driver can build
            // them all in one round.
            let mut missing = 0usize;
            for output in rule.outputs() {
                let key = output.key();
                match self.query(&key).map_err(&fail)? {
                    Some(GraphValue::Artifact(_)) => {}
                    Some(other) => {
                        return Err(fail(GraphError::UnexpectedValue {
                            key,
                            found: other.kind(),
                        }))
                    }
                    None => missing += 1,
                }
            }
            if missing > 0 {
                debug!(
                    attribute = %descriptor.name,
                    %label,
                    missing,
                    "suspending on unbuilt outputs"
                );
                return Ok(None);
            }
        }

        Ok(Some(TypedValue::Providers(rule.providers)))
    }

    fn query(&self, key: &GraphKey) -> Result<Option<GraphValue>, GraphError> {
        trace!(%key, "graph query");
        self.env.graph.query(key)
    }
}

fn check_allowed(
    value: &TypedValue,
    descriptor: &AttributeDescriptor,
    site: TagSite<'_>,
) -> Result<(), ResolutionError> {
    let Some(allowed) = &descriptor.allowed_values else {
        return Ok(());
    };
    // `None` on a label attribute means "no target"; there is nothing to restrict
    if value.is_none() {
        return Ok(());
    }
    if allowed.apply(value) {
        return Ok(());
    }
    Err(ResolutionError::DisallowedValue {
        tag_kind: site.tag_kind.to_string(),
        location: site.location.clone(),
        attribute: descriptor.name.clone(),
        reason: allowed.rejection_reason(value),
    })
}

fn expect_options(value: GraphValue, key: &GraphKey) -> Result<BuildOptions, GraphError> {
    match value {
        GraphValue::BaselineOptions(options) => Ok(options),
        other => Err(GraphError::UnexpectedValue {
            key: key.clone(),
            found: other.kind(),
        }),
    }
}

fn expect_target(value: GraphValue, key: &GraphKey) -> Result<ConfiguredTargetValue, GraphError> {
    match value {
        GraphValue::ConfiguredTarget(target) => Ok(target),
        other => Err(GraphError::UnexpectedValue {
            key: key.clone(),
            found: other.kind(),
        }),
    }
}

fn conversion_error(
    error: ConversionError,
    descriptor: &AttributeDescriptor,
    site: TagSite<'_>,
) -> ResolutionError {
    match error {
        ConversionError::InvalidLabel { source, .. } => ResolutionError::MalformedReference {
            tag_kind: site.tag_kind.to_string(),
            location: site.location.clone(),
            attribute: descriptor.name.clone(),
            source,
        },
        other => ResolutionError::TypeConversion {
            tag_kind: site.tag_kind.to_string(),
            location: site.location.clone(),
            attribute: descriptor.name.clone(),
            source: other,
        },
    }
}

fn graph_error(
    error: GraphError,
    label: &Label,
    descriptor: &AttributeDescriptor,
    site: TagSite<'_>,
) -> ResolutionError {
    match error {
        GraphError::Interrupted => ResolutionError::Interrupted,
        other => ResolutionError::ReferenceFailed {
            tag_kind: site.tag_kind.to_string(),
            location: site.location.clone(),
            attribute: descriptor.name.clone(),
            label: label.clone(),
            message: other.to_string(),
        },
    }
}
