use std::path::{Path, PathBuf};

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use m2a_core::models::Promoter;

use crate::error::{Result, TensorIoError};

///
/// Axis labels of a feature tensor, in tensor order.
///
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TensorManifest {
    /// Window size of each resolution (axis 1).
    pub window_sizes: Vec<u32>,
    /// Signed window offset of each window (axis 2).
    pub offsets: Vec<i32>,
    /// Statistic name of each channel (axis 3).
    pub channels: Vec<String>,
}

impl TensorManifest {
    /// Expected `(R, W, C)` of a tensor described by this manifest.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.window_sizes.len(), self.offsets.len(), self.channels.len())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

///
/// Where the manifest of the archive at `path` lives: `features.npz` -> `features.schema.json`.
///
pub fn manifest_path(path: &Path) -> PathBuf {
    path.with_extension("schema.json")
}

///
/// Everything a downstream model needs: the feature tensor, one promoter per
/// tensor row and optionally the response variable per row.
///
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBundle {
    pub features: Array4<f32>,
    pub promoters: Vec<Promoter>,
    pub response: Option<Vec<f64>>,
    pub manifest: TensorManifest,
}

impl TensorBundle {
    pub fn new(
        features: Array4<f32>,
        promoters: Vec<Promoter>,
        response: Option<Vec<f64>>,
        manifest: TensorManifest,
    ) -> Result<Self> {
        let bundle = TensorBundle {
            features,
            promoters,
            response,
            manifest,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn len(&self) -> usize {
        self.promoters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promoters.is_empty()
    }

    ///
    /// Check that the tensor, metadata, response and manifest agree on every dimension.
    ///
    pub fn validate(&self) -> Result<()> {
        let (n, r, w, c) = self.features.dim();
        if n != self.promoters.len() {
            return Err(TensorIoError::ShapeMismatch(format!(
                "tensor has {} rows but {} promoters were given",
                n,
                self.promoters.len()
            )));
        }
        if let Some(response) = &self.response {
            if response.len() != n {
                return Err(TensorIoError::ShapeMismatch(format!(
                    "tensor has {} rows but {} response values were given",
                    n,
                    response.len()
                )));
            }
        }
        if (r, w, c) != self.manifest.dims() {
            return Err(TensorIoError::ShapeMismatch(format!(
                "tensor axes are {:?} but the manifest describes {:?}",
                (r, w, c),
                self.manifest.dims()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use m2a_core::models::Strand;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn manifest() -> TensorManifest {
        TensorManifest {
            window_sizes: vec![250, 2500],
            offsets: vec![-1, 1],
            channels: vec!["Ave".into(), "FracSSD".into(), "SSD".into(), "Var".into()],
        }
    }

    fn promoter(id: &str) -> Promoter {
        Promoter {
            transcript_id: id.to_string(),
            gene_id: "G".to_string(),
            gene_name: "g".to_string(),
            strand: Strand::Plus,
            chr: "chr1".to_string(),
            start: 10,
            end: 20,
            response_start: 0,
            response_end: 20,
        }
    }

    #[rstest]
    fn test_manifest_path() {
        assert_eq!(
            manifest_path(Path::new("out/features.npz")),
            PathBuf::from("out/features.schema.json")
        );
    }

    #[rstest]
    fn test_bundle_accepts_matching_parts(manifest: TensorManifest) {
        let bundle = TensorBundle::new(
            Array4::zeros((2, 2, 2, 4)),
            vec![promoter("a"), promoter("b")],
            Some(vec![0.5, -0.5]),
            manifest,
        );
        assert!(bundle.is_ok());
    }

    #[rstest]
    fn test_bundle_rejects_row_mismatch(manifest: TensorManifest) {
        let bundle = TensorBundle::new(Array4::zeros((2, 2, 2, 4)), vec![promoter("a")], None, manifest);
        assert!(matches!(bundle, Err(TensorIoError::ShapeMismatch(_))));
    }

    #[rstest]
    fn test_bundle_rejects_response_mismatch(manifest: TensorManifest) {
        let bundle = TensorBundle::new(
            Array4::zeros((1, 2, 2, 4)),
            vec![promoter("a")],
            Some(vec![1.0, 2.0]),
            manifest,
        );
        assert!(matches!(bundle, Err(TensorIoError::ShapeMismatch(_))));
    }

    #[rstest]
    fn test_bundle_rejects_axis_mismatch(manifest: TensorManifest) {
        let bundle = TensorBundle::new(Array4::zeros((1, 2, 3, 4)), vec![promoter("a")], None, manifest);
        assert!(matches!(bundle, Err(TensorIoError::ShapeMismatch(_))));
    }

    #[rstest]
    fn test_manifest_json(manifest: TensorManifest) {
        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"FracSSD\""));
        assert_eq!(TensorManifest::from_json(&json).unwrap(), manifest);
    }
}
