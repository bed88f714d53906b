//! Cardstore container: a hierarchical, self-describing store.
//!
//! The data model follows HDF5:
//!
//! ```text
//! Document
//!   └─ Group ──┬─ attrs: name -> Int | Float | Str
//!              ├─ Group ...            (nest arbitrarily)
//!              └─ Dataset              (typed array + dataspace)
//!                   ├─ dtype:  int64 | float64 | bool | bytes
//!                   └─ space:  null | scalar | [n] | [n, m]
//! ```
//!
//! This is not an HDF5 file. The tree borrows HDF5's vocabulary (groups,
//! datasets, attributes, dataspaces) but a document is serialized as a
//! `CSH5` magic header, a format version and a bincode payload of the root
//! group; `h5py`, `h5dump` and other HDF5 tools cannot open it. See
//! [`file`] for the byte layout.
//!
//! Writes go through [`ContainerFile`], which only exposes a file at its
//! final path after a successful commit.

pub mod dataset;
mod error;
pub mod file;
pub mod group;

pub use dataset::{ArrayData, DType, Dataset, Dataspace, Element};
pub use error::{ContainerError, Result};
pub use file::{ContainerFile, Document, FORMAT_VERSION, MAGIC};
pub use group::{AttrValue, Group, Node};
