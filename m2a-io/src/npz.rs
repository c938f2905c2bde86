use std::fs::{File, create_dir_all, read_to_string, write};
use std::path::Path;

use log::info;
use ndarray::{Array1, Array2, Array4};
use ndarray_npy::{NpzReader, NpzWriter};

use m2a_core::models::{PROMOTER_COLUMNS, parse_promoter_fields};

use crate::bundle::{TensorBundle, TensorManifest, manifest_path};
use crate::error::{Result, TensorIoError};

/// Dataset holding the `(N, R, W, C)` feature tensor.
pub const FEATURE_DATASET: &str = "FeatureInput";

/// Dataset holding the optional per-promoter response variable.
pub const RESPONSE_DATASET: &str = "log2_ChipDivInput";

///
/// Pack strings into a NUL-padded fixed-width byte matrix, one row per string.
/// The width is the longest string's byte length (at least 1).
///
pub fn encode_fixed_width(values: &[String]) -> Array2<u8> {
    let width = values.iter().map(|v| v.len()).max().unwrap_or(0).max(1);
    let mut encoded = Array2::<u8>::zeros((values.len(), width));
    for (mut row, value) in encoded.rows_mut().into_iter().zip(values) {
        for (slot, byte) in row.iter_mut().zip(value.bytes()) {
            *slot = byte;
        }
    }
    encoded
}

///
/// Inverse of [encode_fixed_width]: strip the NUL padding off every row.
///
pub fn decode_fixed_width(field: &str, encoded: &Array2<u8>) -> Result<Vec<String>> {
    encoded
        .rows()
        .into_iter()
        .map(|row| {
            let bytes: Vec<u8> = row.iter().copied().take_while(|b| *b != 0).collect();
            String::from_utf8(bytes).map_err(|e| TensorIoError::InvalidField {
                field: field.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

///
/// Write a bundle to an `.npz` archive and its manifest next to it.
///
/// # Arguments
/// - bundle: the bundle to persist
/// - path: the archive path, e.g. `features.npz`
pub fn write_npz<T: AsRef<Path>>(bundle: &TensorBundle, path: T) -> Result<()> {
    let path = path.as_ref();
    bundle.validate()?;

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array(FEATURE_DATASET, &bundle.features)?;

    let fields: Vec<[String; 9]> = bundle.promoters.iter().map(|p| p.fields()).collect();
    for (i, column) in PROMOTER_COLUMNS.iter().enumerate() {
        let values: Vec<String> = fields.iter().map(|f| f[i].clone()).collect();
        npz.add_array(*column, &encode_fixed_width(&values))?;
    }

    if let Some(response) = &bundle.response {
        npz.add_array(RESPONSE_DATASET, &Array1::from(response.clone()))?;
    }
    npz.finish()?;

    write(manifest_path(path), bundle.manifest.to_json()?)?;

    info!(
        "Wrote tensor of shape {:?} for {} promoters to {}",
        bundle.features.shape(),
        bundle.len(),
        path.display()
    );
    Ok(())
}

///
/// Read a bundle written by [write_npz]. The manifest must sit next to the archive.
///
pub fn read_npz<T: AsRef<Path>>(path: T) -> Result<TensorBundle> {
    let path = path.as_ref();
    let mut npz = NpzReader::new(File::open(path)?)?;
    let names = npz.names()?;
    let has_array = |name: &str| {
        names
            .iter()
            .any(|n| n == name || n.strip_suffix(".npy") == Some(name))
    };

    let features: Array4<f32> = npz.by_name(FEATURE_DATASET)?;
    let n = features.dim().0;

    let mut columns: Vec<Vec<String>> = Vec::with_capacity(PROMOTER_COLUMNS.len());
    for column in PROMOTER_COLUMNS {
        let encoded: Array2<u8> = npz.by_name(column)?;
        let values = decode_fixed_width(column, &encoded)?;
        if values.len() != n {
            return Err(TensorIoError::ShapeMismatch(format!(
                "`{}` has {} rows, tensor has {}",
                column,
                values.len(),
                n
            )));
        }
        columns.push(values);
    }

    let positions: Vec<usize> = (0..PROMOTER_COLUMNS.len()).collect();
    let promoters = (0..n)
        .map(|row| {
            let parts: Vec<&str> = columns.iter().map(|c| c[row].as_str()).collect();
            parse_promoter_fields(&parts, &positions, row + 1)
        })
        .collect::<m2a_core::Result<Vec<_>>>()?;

    let response = if has_array(RESPONSE_DATASET) {
        let values: Array1<f64> = npz.by_name(RESPONSE_DATASET)?;
        Some(values.to_vec())
    } else {
        None
    };

    let manifest = TensorManifest::from_json(&read_to_string(manifest_path(path))?)?;

    let bundle = TensorBundle::new(features, promoters, response, manifest)?;
    info!("Loaded {} promoters from {}", bundle.len(), path.display());
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    use m2a_core::models::{Promoter, Strand};
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn bundle() -> TensorBundle {
        let promoters = vec![
            Promoter {
                transcript_id: "ENST0001.1".to_string(),
                gene_id: "ENSG0001.1".to_string(),
                gene_name: "TP53".to_string(),
                strand: Strand::Minus,
                chr: "chr17".to_string(),
                start: 7_661_779,
                end: 7_687_538,
                response_start: 7_686_538,
                response_end: 7_688_538,
            },
            Promoter {
                transcript_id: "ENST0002.3".to_string(),
                gene_id: "ENSG0002.2".to_string(),
                gene_name: "".to_string(),
                strand: Strand::Plus,
                chr: "chr1".to_string(),
                start: 100,
                end: 5000,
                response_start: -900,
                response_end: 1100,
            },
        ];
        let features = Array4::from_shape_fn((2, 2, 2, 4), |(n, r, w, c)| {
            (n * 1000 + r * 100 + w * 10 + c) as f32 / 1000.0
        });
        let manifest = TensorManifest {
            window_sizes: vec![250, 2500],
            offsets: vec![-1, 1],
            channels: vec!["Ave".into(), "FracSSD".into(), "SSD".into(), "Var".into()],
        };
        TensorBundle::new(features, promoters, Some(vec![1.5, -0.25]), manifest).unwrap()
    }

    #[rstest]
    fn test_encode_fixed_width_pads_with_nul() {
        let encoded = encode_fixed_width(&["ab".to_string(), "abcd".to_string(), "".to_string()]);
        assert_eq!(encoded.dim(), (3, 4));
        assert_eq!(encoded.row(0).to_vec(), vec![b'a', b'b', 0, 0]);
        assert_eq!(encoded.row(2).to_vec(), vec![0, 0, 0, 0]);

        let decoded = decode_fixed_width("Gene", &encoded).unwrap();
        assert_eq!(decoded, vec!["ab", "abcd", ""]);
    }

    #[rstest]
    fn test_encode_empty_strings_keeps_one_byte() {
        let encoded = encode_fixed_width(&["".to_string()]);
        assert_eq!(encoded.dim(), (1, 1));
    }

    #[rstest]
    fn test_decode_rejects_invalid_utf8() {
        let encoded = Array2::from_shape_vec((1, 2), vec![0xff, 0xfe]).unwrap();
        let result = decode_fixed_width("Gene", &encoded);
        assert!(matches!(result, Err(TensorIoError::InvalidField { .. })));
    }

    #[rstest]
    fn test_write_then_read_bundle(bundle: TensorBundle) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("features.npz");

        write_npz(&bundle, &path).unwrap();
        assert!(dir.path().join("nested").join("features.schema.json").exists());

        let read = read_npz(&path).unwrap();
        assert_eq!(read, bundle);
    }

    #[rstest]
    fn test_bundle_without_response(mut bundle: TensorBundle) {
        bundle.response = None;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.npz");

        write_npz(&bundle, &path).unwrap();
        let read = read_npz(&path).unwrap();
        assert_eq!(read.response, None);
        assert_eq!(read.features, bundle.features);
    }

    #[rstest]
    fn test_read_requires_manifest(bundle: TensorBundle) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.npz");
        write_npz(&bundle, &path).unwrap();
        std::fs::remove_file(manifest_path(&path)).unwrap();

        assert!(matches!(read_npz(&path), Err(TensorIoError::Io(_))));
    }
}
