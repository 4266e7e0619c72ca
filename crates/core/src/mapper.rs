//! Forward projection of resolved attributes into canonical fragments.
//!
//! Dispatch is by exact type identifier; display text never decides what an attribute means.
//! Every attribute goes through [`dispatch`], which has exactly two routes to a projection:
//!
//! - the synthetic [`ADDRESS_ATTRIBUTE_TYPE`], which the resolver assigns to followed address
//!   links. It carries a structured address rather than a text value, so it cannot be a row of
//!   [`crate::bindings::BINDINGS`] and is projected by [`crate::address::project_address`];
//! - a row of the binding table, found with [`crate::bindings::binding_for`].
//!
//! Attributes matching neither are passed through unprojected.

use bridge_types::NonEmptyText;
use serde::Serialize;

use crate::address::{self, ADDRESS_ATTRIBUTE_TYPE};
use crate::bindings::{binding_for, ExtensionBinding, ProjectionContext};
use crate::canonical::{CanonicalFragment, PassThrough};
use crate::error::MappingError;
use crate::resolver::ResolvedAttribute;

/// Why a resolved attribute contributed nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Voided,
    BlankValue,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Voided => "voided",
            DropReason::BlankValue => "blank value",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DroppedAttribute {
    pub link_id: String,
    pub type_id: String,
    pub reason: DropReason,
}

/// How an attribute type is projected.
#[derive(Clone, Copy, Debug)]
pub enum Dispatch {
    /// A followed address link.
    Address,
    Bound(&'static ExtensionBinding),
    Unbound,
}

/// Decide how attributes of `type_id` are projected.
pub fn dispatch(type_id: &str) -> Dispatch {
    if type_id == ADDRESS_ATTRIBUTE_TYPE {
        return Dispatch::Address;
    }
    binding_for(type_id).map_or(Dispatch::Unbound, Dispatch::Bound)
}

/// Result of mapping a batch of resolved attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappedAttributes {
    /// Fragments in attribute order; a binding's own outputs keep their order.
    pub fragments: Vec<CanonicalFragment>,
    pub passthrough: Vec<PassThrough>,
    pub dropped: Vec<DroppedAttribute>,
    pub errors: Vec<MappingError>,
}

/// Map resolved attributes to canonical fragments.
///
/// Every input attribute ends up in exactly one of the four output lists.
pub fn map_attributes(
    attributes: &[ResolvedAttribute],
    ctx: &ProjectionContext<'_>,
) -> MappedAttributes {
    let mut out = MappedAttributes::default();

    for attribute in attributes {
        if attribute.voided {
            drop_attribute(&mut out, attribute, DropReason::Voided);
            continue;
        }

        let binding = match dispatch(&attribute.type_id) {
            Dispatch::Address => {
                match address::project_address(attribute) {
                    Ok(addr) => out.fragments.push(CanonicalFragment::Address(addr)),
                    Err(err) => {
                        tracing::warn!(error = %err, "address attribute is incomplete");
                        out.errors.push(err);
                    }
                }
                continue;
            }
            Dispatch::Bound(binding) => binding,
            Dispatch::Unbound => {
                tracing::debug!(type_id = %attribute.type_id, "no binding; passing through");
                out.passthrough
                    .push(PassThrough::SourceAttribute(attribute.clone()));
                continue;
            }
        };

        let Ok(value) = NonEmptyText::new(&attribute.display) else {
            drop_attribute(&mut out, attribute, DropReason::BlankValue);
            continue;
        };

        let fragments = (binding.project)(&value, ctx);
        tracing::debug!(
            binding = binding.name,
            count = fragments.len(),
            "projected attribute"
        );
        out.fragments.extend(fragments);
    }

    out
}

fn drop_attribute(out: &mut MappedAttributes, attribute: &ResolvedAttribute, reason: DropReason) {
    tracing::warn!(
        link_id = %attribute.link_id,
        type_id = %attribute.type_id,
        ?reason,
        "dropping attribute"
    );
    out.dropped.push(DroppedAttribute {
        link_id: attribute.link_id.clone(),
        type_id: attribute.type_id.clone(),
        reason,
    });
}
