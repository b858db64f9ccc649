//! Prints the CRD manifests for both workload schema dialects to stdout.
//!
//! Usage: `cargo run --bin crdgen > config/crds.yaml`

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::ClusterInstallation::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&crds::MeetMesh::crd())?);
    Ok(())
}
