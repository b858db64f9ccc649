//! MeetMesh provisioning domain records
//!
//! Plain records describing what the provisioning service knows about
//! clusters, installations, and the bindings between them. These are owned
//! by the external store; the reconciler core only reads them (and writes
//! derived utility version metadata back onto `Cluster`).

pub mod cluster;
pub mod cluster_installation;
pub mod installation;

pub use cluster::*;
pub use cluster_installation::*;
pub use installation::*;
