// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query compilation: filters, ordering, pagination, payloads, projections,
//! aggregates and the operation plans built from them.

pub mod aggregate;
pub mod args;
pub mod data;
pub mod filter;
pub mod group_by;
pub mod operation;
pub mod order;
pub mod pipeline;
pub mod selection;

pub use aggregate::{AggregateFn, AggregateResult, AggregateSpec};
pub use args::{
    AggregateArgs, AggregateFields, Args, CountArgs, CreateArgs, CreateManyArgs, DeleteArgs,
    DeleteManyArgs, FindManyArgs, FindUniqueArgs, GroupByArgs, Projection, UpdateArgs,
    UpdateManyArgs, UpsertArgs,
};
pub use data::{CreateInput, FieldUpdate, RelationWrite, UpdateInput};
pub use filter::{Filter, QueryMode};
pub use group_by::{GroupByPlan, GroupRow};
pub use operation::{
    compile, Action, CompiledOperation, CountResult, CountSelect, Operation, OperationOutput, Plan,
};
pub use order::{OrderBy, SortOrder};
pub use pipeline::FindQuery;
pub use selection::Selection;
