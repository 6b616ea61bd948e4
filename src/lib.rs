#![doc = include_str!("../README.md")]

pub use crate::error::{Error, Mismatch, Result};
pub use crate::geometry::{Coord, Geometry, GeometryKind};
pub use crate::grid::{Grid, GridBuilder};
pub use crate::opl::{ObjectType, OplStore};
pub use crate::scenario::Scenario;
pub use crate::table::{Column, ColumnKind, DbRow, DbValue, Table};

pub mod compare;
mod error;
pub mod geometry;
pub mod grid;
pub mod opl;
mod scenario;
pub mod table;
