//! ClusterImageSet CRD, a named OpenShift release

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OpenShift release image clusters can be installed from
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "ClusterImageSet",
    plural = "clusterimagesets",
    shortname = "imgset",
    printcolumn = r#"{"name":"Release","type":"string","jsonPath":".spec.releaseImage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterImageSetSpec {
    /// Pull spec of the release image
    pub release_image: String,
}
