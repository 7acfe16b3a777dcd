pub mod action;
pub mod restriction;

pub use action::{
    ActionMetadata, ActionType, CascadeLineage, ModerationAction, NewAction, ReversalFilters,
    ReversalMetadata, RevocationUpdate, StateChangeEntry, StateChangeKind,
};
pub use restriction::{NewRestriction, Restriction, RestrictionKind};
