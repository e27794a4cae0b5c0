// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static description of the entities, their scalar fields and relations.

mod definitions;
pub mod field;
pub mod registry;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use field::{Cardinality, DefaultValue, FieldDef, OnDelete, RelationDef, ScalarType};
pub use registry::{EntitySchema, SchemaRegistry};

/// The seven record types managed by the data-access layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    Serialize, Deserialize,
)]
pub enum Entity {
    User,
    OtpCode,
    Session,
    Subscription,
    SubscriptionHistory,
    Video,
    AnalyticsEvent,
}
