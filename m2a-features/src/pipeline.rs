use log::info;

use m2a_io::{TensorBundle, TensorManifest};

use crate::config::PipelineConfig;
use crate::errors::{FeatureError, Result};
use crate::metadata::{ResponseTable, align_metadata};
use crate::normalize::normalize;
use crate::schema::FeatureSchema;
use crate::table::FeatureTable;
use crate::tensor::assemble_table;

impl From<&FeatureSchema> for TensorManifest {
    fn from(schema: &FeatureSchema) -> Self {
        TensorManifest {
            window_sizes: schema.window_sizes.clone(),
            offsets: schema.offsets.clone(),
            channels: schema.channel_names(),
        }
    }
}

///
/// Turn extracted window features into a model-ready bundle: normalise,
/// assemble the tensor and align the promoter metadata (and response, if
/// given) to its rows.
///
/// # Arguments
/// - table: window features, as extracted or read back from disk
/// - config: scaling range and fill value
/// - response: response variable to attach, keyed by transcript ID
pub fn combine(
    table: &FeatureTable,
    config: &PipelineConfig,
    response: Option<&ResponseTable>,
) -> Result<TensorBundle> {
    config.validate()?;
    let expected = FeatureSchema::new(&config.window_sizes, config.num_windows);
    if table.schema != expected {
        return Err(FeatureError::SchemaMismatch(format!(
            "features were computed for window sizes {:?} x {} windows, configuration asks for {:?} x {}",
            table.schema.window_sizes,
            table.schema.num_windows(),
            config.window_sizes,
            config.num_windows
        )));
    }

    let normalized = normalize(table, config.scale_range, config.missing_fill)?;
    let assembled = assemble_table(&normalized)?;
    let aligned = align_metadata(&assembled.keys, &normalized.promoters, response)?;

    info!(
        "Combined {} promoters{}",
        assembled.keys.len(),
        if aligned.response.is_some() { " with response" } else { "" }
    );

    Ok(TensorBundle::new(
        assembled.tensor,
        aligned.promoters,
        aligned.response,
        TensorManifest::from(&table.schema),
    )?)
}
