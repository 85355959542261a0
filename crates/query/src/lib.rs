//! Cohort query compiler — turns declarative cohort definitions into the
//! boolean condition trees the targeting platform's matching engine runs.

pub mod builder;
pub mod engine;
pub mod merge;
pub mod predicates;
pub mod seed;
pub mod slug;

pub use engine::QueryCompiler;
pub use merge::{merge_item, merge_list, CohortMerger};
pub use predicates::{Condition, Query};
pub use seed::{filter_by_workspace, roll_up_seeds};
pub use slug::slugify_keywords;
