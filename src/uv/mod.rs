//! UV projection and editing.
//!
//! Every face is either auto (its primary UVs are derived from positions by
//! [`RefreshAutoUvs`]) or manual (its UVs are only changed by explicit
//! projection and editing operations).

pub mod auto;
pub mod element_groups;
pub mod project;
pub mod projection;
pub mod tools;

pub use auto::RefreshAutoUvs;
pub use element_groups::RefreshElementGroups;
pub use projection::{BoxProject, PlanarProject, SphericalProject};
pub use tools::{CenterUvs, CollapseUvs, FitUvs, FlipAxis, FlipUvs, SetUvMode, SewUvs, SplitUvs};
