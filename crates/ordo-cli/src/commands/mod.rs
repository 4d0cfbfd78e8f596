//! CLI command implementations

pub(crate) mod apply;
pub(crate) mod common;
pub(crate) mod ls;
pub(crate) mod plan;
pub(crate) mod unlock;
